use crate::write_atomic;
use radar_core::StateError;
use relevance_engine::RotationCursor;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Rotation cursor kept as a single line in a small text file.
#[derive(Debug, Clone)]
pub struct FileRotationCursor {
    path: PathBuf,
}

impl FileRotationCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RotationCursor for FileRotationCursor {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let value = raw.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    "Could not read rotation cursor {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    fn save(&mut self, subcategory: &str) -> Result<(), StateError> {
        write_atomic(&self.path, format!("{}\n", subcategory.trim()).as_bytes())?;
        debug!("Rotation cursor set to '{}'", subcategory);
        Ok(())
    }
}

/// In-memory cursor seeded from a persisted one, so dry runs rotate exactly
/// like real runs without writing anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunCursor {
    value: Option<String>,
}

impl DryRunCursor {
    pub fn seeded_from<C: RotationCursor + ?Sized>(cursor: &C) -> Self {
        Self {
            value: cursor.load(),
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl RotationCursor for DryRunCursor {
    fn load(&self) -> Option<String> {
        self.value.clone()
    }

    fn save(&mut self, subcategory: &str) -> Result<(), StateError> {
        self.value = Some(subcategory.to_string());
        Ok(())
    }
}
