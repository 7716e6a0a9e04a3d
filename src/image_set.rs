use crate::config::SUPPORTED_IMAGE_EXTENSIONS;
use crate::error::{MarkerError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists the supported images directly inside `dir`, sorted by path.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MarkerError::InputDirMissing(dir.to_path_buf()));
    }

    let mut image_files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| MarkerError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect();

    image_files.sort();
    Ok(image_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_supported_extensions_in_sorted_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["b.png", "a.JPG", "c.jpeg", "notes.txt", "d.gif"] {
            fs::write(temp.path().join(name), b"").expect("write file");
        }
        fs::create_dir(temp.path().join("nested.png")).expect("create dir");

        let files = scan_directory(temp.path()).expect("scan");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = scan_directory(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, MarkerError::InputDirMissing(_)));
    }
}
