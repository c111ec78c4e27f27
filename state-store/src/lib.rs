pub mod posted;
pub mod rotation;

pub use posted::{parse_posted_ids, PostedStore};
pub use rotation::{DryRunCursor, FileRotationCursor};

use radar_core::StateError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `contents` by writing a sibling temp file and renaming
/// it into place. Creates the parent directory when missing.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| StateError::DirectoryFailed {
            path: dir.display().to_string(),
            source,
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write_failed = |source: std::io::Error| StateError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    let mut file = fs::File::create(&tmp_path).map_err(write_failed)?;
    file.write_all(contents).map_err(write_failed)?;
    file.sync_all().map_err(write_failed)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        write_failed(source)
    })
}
