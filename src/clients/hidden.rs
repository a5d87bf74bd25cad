use std::path::Path;

use anyhow::{Error, Result};

/// Whether a directory entry counts as hidden on this platform.
#[cfg(not(windows))]
pub fn is_hidden(path: &Path) -> Result<bool, Error> {
    Ok(path
        .file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false))
}

#[cfg(windows)]
pub fn is_hidden(path: &Path) -> Result<bool, Error> {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    let metadata = std::fs::metadata(path)?;
    Ok(metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
}
