//! Input enumeration: find image files and open them as tasks.

use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::ImageTask;

/// Discovers image files in a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl DiscoveredFile {
    /// Open the file as a task, enforcing `max_bytes`.
    pub fn open(&self, max_bytes: u64) -> PipelineResult<ImageTask> {
        open_image(&self.path, max_bytes)
    }
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all supported image files at a path.
    ///
    /// A file is returned as-is if supported. A directory is scanned one
    /// level deep, or fully when `recursive` is set. Results are sorted by
    /// path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            if self.is_supported(path) {
                if let Ok(meta) = std::fs::metadata(path) {
                    return vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        size: meta.len(),
                    }];
                }
            }
            return vec![];
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: entry.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

/// Open `path` as a task named after the path, rejecting files over `max_bytes`.
pub fn open_image(path: &Path, max_bytes: u64) -> PipelineResult<ImageTask> {
    let file = File::open(path)?;
    let actual = file.metadata()?.len();
    if actual > max_bytes {
        return Err(PipelineError::FileTooLarge {
            path: path.to_path_buf(),
            actual,
            limit: max_bytes,
        });
    }
    Ok(ImageTask::new(path.to_string_lossy(), file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn touch(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(!discovery.is_supported(Path::new("test.webp")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("png")));
    }

    #[test]
    fn test_discover_is_flat_by_default() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.png"), b"1");
        touch(&dir.path().join("a.jpg"), b"22");
        touch(&dir.path().join("notes.txt"), b"x");
        touch(&dir.path().join("nested/c.png"), b"333");

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(FileDiscovery::total_size(&files), 3);
    }

    #[test]
    fn test_discover_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"), b"1");
        touch(&dir.path().join("nested/deeper/c.png"), b"1");

        let config = ProcessingConfig {
            recursive: true,
            ..ProcessingConfig::default()
        };
        assert_eq!(FileDiscovery::new(config).discover(dir.path()).len(), 2);
    }

    #[test]
    fn test_open_image_enforces_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        touch(&path, &[0u8; 64]);

        let err = open_image(&path, 10).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { actual: 64, limit: 10, .. }));

        let mut task = open_image(&path, 64).unwrap();
        assert_eq!(task.name, path.to_string_lossy());
        let mut buf = Vec::new();
        task.input.read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 64);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = open_image(Path::new("/definitely/not/here.png"), 10).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
