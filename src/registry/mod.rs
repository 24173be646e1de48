//! Upload directory-policy collaborator (§H): tracks which locally-produced files
//! have been uploaded, failed, or must be protected from deletion.
//!
//! Grounded on the original source's failure-tracking JSON registry, extended here
//! with a parallel success map since the success side of the contract is otherwise
//! untestable (the original prototype only persists failures).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The file kinds the registry tracks (§6 segment kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Continuous,
    Mseed,
    Event,
    Tmp,
    Log,
}

impl SegmentKind {
    const ALL: [SegmentKind; 5] =
        [SegmentKind::Continuous, SegmentKind::Mseed, SegmentKind::Event, SegmentKind::Tmp, SegmentKind::Log];
}

type KindMap = HashMap<String, chrono::DateTime<chrono::Utc>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDoc {
    #[serde(default)]
    archivos_exitosos: HashMap<SegmentKind, KindMap>,
    #[serde(default)]
    archivos_fallidos: HashMap<SegmentKind, KindMap>,
}

impl RegistryDoc {
    fn new_empty() -> Self {
        let mut doc = Self::default();
        for kind in SegmentKind::ALL {
            doc.archivos_exitosos.entry(kind).or_default();
            doc.archivos_fallidos.entry(kind).or_default();
        }
        doc
    }
}

/// File-backed registry of upload outcomes, one JSON document per station.
///
/// All mutators take the same mutex, mirroring the original source's single
/// process-wide file lock around read-modify-write of the JSON document.
pub struct UploadRegistry {
    path: PathBuf,
    doc: Mutex<RegistryDoc>,
}

impl UploadRegistry {
    /// Load `path` if it exists, or start from an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents).unwrap_or_else(|_| RegistryDoc::new_empty())
        } else {
            RegistryDoc::new_empty()
        };
        Ok(Self { path, doc: Mutex::new(doc) })
    }

    fn persist(&self, doc: &RegistryDoc) -> std::io::Result<()> {
        let serialized = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn mark_success(&self, name: &str, kind: SegmentKind) -> std::io::Result<()> {
        let mut doc = self.doc.lock();
        doc.archivos_fallidos.entry(kind).or_default().remove(name);
        doc.archivos_exitosos.entry(kind).or_default().insert(name.to_string(), chrono::Utc::now());
        self.persist(&doc)
    }

    pub fn mark_failure(&self, name: &str, kind: SegmentKind) -> std::io::Result<()> {
        let mut doc = self.doc.lock();
        doc.archivos_fallidos.entry(kind).or_default().insert(name.to_string(), chrono::Utc::now());
        self.persist(&doc)
    }

    pub fn is_uploaded(&self, name: &str, kind: SegmentKind) -> bool {
        self.doc.lock().archivos_exitosos.get(&kind).map(|m| m.contains_key(name)).unwrap_or(false)
    }

    /// A file is protected from deletion/retention sweeps while it is recorded as
    /// failed (mirrors `esta_protegido`) and not yet recorded as a success.
    pub fn is_protected(&self, name: &str, kind: SegmentKind) -> bool {
        let doc = self.doc.lock();
        let failed = doc.archivos_fallidos.get(&kind).map(|m| m.contains_key(name)).unwrap_or(false);
        let succeeded = doc.archivos_exitosos.get(&kind).map(|m| m.contains_key(name)).unwrap_or(false);
        failed && !succeeded
    }

    /// Drop entries for files that no longer exist on disk, given a directory per
    /// kind. Returns the number of entries removed.
    pub fn prune_missing(&self, dir_map: &HashMap<SegmentKind, PathBuf>) -> std::io::Result<usize> {
        let mut doc = self.doc.lock();
        let mut removed = 0usize;

        for (kind, dir) in dir_map {
            for map in [doc.archivos_exitosos.get_mut(kind), doc.archivos_fallidos.get_mut(kind)] {
                let Some(map) = map else { continue };
                let missing: Vec<String> = map
                    .keys()
                    .filter(|name| !Path::new(dir).join(name).exists())
                    .cloned()
                    .collect();
                for name in missing {
                    map.remove(&name);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            self.persist(&doc)?;
        }
        Ok(removed)
    }
}
