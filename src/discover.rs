use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::analysis::FileListSource;
/// Files in `dir` ending in `.{extension}` (case-insensitive), sorted by name.
pub fn find_waveform_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("cannot list {}", dir.display()))?
            .path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
pub fn waveform_source(dir: &Path, extension: &str) -> Result<FileListSource> {
    Ok(FileListSource::new(find_waveform_files(dir, extension)?))
}
