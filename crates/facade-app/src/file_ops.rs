//! File output for exported frames.

use std::io;
use std::path::{Path, PathBuf};

/// Write PNG bytes to `dir/filename`, creating `dir` if needed.
///
/// Empty data is refused so a failed capture never leaves an empty file.
pub fn export_png(dir: &Path, filename: &str, png_data: &[u8]) -> io::Result<PathBuf> {
    if png_data.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "refusing to write empty PNG"));
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    match std::fs::write(&path, png_data) {
        Ok(()) => {
            log::info!("Exported PNG to: {:?}", path);
            Ok(path)
        }
        Err(e) => {
            log::error!("Failed to write PNG: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out");
        let path = export_png(&nested, "wall-design-3d.png", &[1, 2, 3]).unwrap();
        assert_eq!(path, nested.join("wall-design-3d.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_data_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_png(dir.path(), "x.png", &[]).is_err());
        assert!(!dir.path().join("x.png").exists());
    }
}
