//! The narrow model capability the engine is written against (§9 "Model interop"):
//! `set_input` / `invoke` / `get_output`, pinned to a fixed `[B, 400, 3]` batch
//! shape for the lifetime of the process — the engine never reshapes the
//! interpreter between batches.

use crate::error::{InferenceError, ModelLoadError};

/// Sliding-window length the model was trained on.
pub const N_FEAT: usize = 400;
/// Input channels per window (vertical/north/east). Numerically equal to
/// `N_OUT` but a distinct axis — kept as its own const so the staging buffer's
/// channel stride is never confused with the output class count.
pub const N_CHANNELS: usize = 3;
/// Output classes: `(P_prob, S_prob, noise_prob)`.
pub const N_OUT: usize = 3;

/// Fixed-shape batched classifier capability. Implementations own their interpreter
/// exclusively — the inference task is the only caller.
pub trait PhaseModel: Send {
    /// Copy `tensor` (length `batch_size * N_FEAT * 3`) into the interpreter's input.
    fn set_input(&mut self, tensor: &[f32]) -> Result<(), InferenceError>;

    /// Run one forward pass over the currently staged input.
    fn invoke(&mut self) -> Result<(), InferenceError>;

    /// Read back the `[batch_size, N_OUT]` output of the last `invoke`.
    fn get_output(&self) -> &[f32];

    fn batch_size(&self) -> usize;
}

/// ONNX Runtime-backed implementation of [`PhaseModel`], binding the GPD v2 model.
pub struct OrtPhaseModel {
    session: ort::Session,
    batch_size: usize,
    input_name: String,
    staged_input: Option<Vec<f32>>,
    output: Vec<f32>,
}

impl OrtPhaseModel {
    pub fn load(model_path: &std::path::Path, batch_size: usize, num_threads: usize) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::NotFound { path: model_path.to_path_buf() });
        }

        let session = ort::Session::builder()
            .and_then(|b| b.with_intra_threads(num_threads))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| ModelLoadError::Backend(e.to_string()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ModelLoadError::Backend("model exposes no inputs".into()))?;

        Ok(Self {
            session,
            batch_size,
            input_name,
            staged_input: None,
            output: vec![0.0; batch_size * N_OUT],
        })
    }
}

impl PhaseModel for OrtPhaseModel {
    fn set_input(&mut self, tensor: &[f32]) -> Result<(), InferenceError> {
        if tensor.len() != self.batch_size * N_FEAT * N_CHANNELS {
            return Err(InferenceError::Invoke(format!(
                "expected {} input values, got {}",
                self.batch_size * N_FEAT * N_CHANNELS,
                tensor.len()
            )));
        }
        self.staged_input = Some(tensor.to_vec());
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), InferenceError> {
        let staged = self
            .staged_input
            .take()
            .ok_or_else(|| InferenceError::Invoke("invoke called before set_input".into()))?;

        let shape = [self.batch_size, N_FEAT, N_CHANNELS];
        let input_value = ort::Value::from_array((shape, staged))
            .map_err(|e| InferenceError::Invoke(format!("failed to build input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| InferenceError::Invoke(format!("onnxruntime invoke failed: {e}")))?;

        let (_, output_data) = outputs[0]
            .try_extract_raw_tensor::<f32>()
            .map_err(|e| InferenceError::Invoke(format!("failed to read output tensor: {e}")))?;

        self.output.clear();
        self.output.extend_from_slice(output_data);
        Ok(())
    }

    fn get_output(&self) -> &[f32] {
        &self.output
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}
