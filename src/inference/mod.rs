//! Inference pipeline: sliding-window batched GPD invocation and trigger detection.

mod engine;
mod model;
mod trigger;

pub use engine::{run_inference, window_count, WindowMeta};
pub use model::{OrtPhaseModel, PhaseModel, N_CHANNELS, N_FEAT, N_OUT};
pub use trigger::{HysteresisTrigger, TriggerWindow};
