//! Byte-level change detection between two cache generations.

use std::fs;
use std::path::Path;

/// Whether the file at `new_path` differs from the one at `old_path`.
///
/// Identical paths mean there was no distinct earlier generation, which is
/// never a change. Otherwise the contents are compared exactly. If either
/// file cannot be read the answer is `true`.
pub fn has_changed(new_path: &Path, old_path: &Path) -> bool {
    if new_path == old_path {
        return false;
    }

    let new = match fs::read(new_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Cannot read {:?} for comparison: {}", new_path, e);
            return true;
        }
    };
    let old = match fs::read(old_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Cannot read {:?} for comparison: {}", old_path, e);
            return true;
        }
    };

    if new != old {
        log::info!(
            "Content of {:?} differs from {:?}",
            new_path.file_name().unwrap_or_default(),
            old_path.file_name().unwrap_or_default()
        );
        return true;
    }
    false
}
