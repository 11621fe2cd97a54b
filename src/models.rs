//! Core data types for Sketch Deploy.

use std::fmt;
use std::path::{Path, PathBuf};

/// How the web assets reach the device.
///
/// Chosen once per run from the command line and passed explicitly to every
/// component whose behaviour depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackagingMode {
    /// Gzipped files staged into `<sketch>/data` and flashed as a SPIFFS image
    FilesystemImage,
    /// Assets compiled into the firmware through a generated C header
    EmbeddedHeader,
}

impl PackagingMode {
    /// Select the mode from the `--progmem` switch.
    pub fn from_progmem_flag(progmem: bool) -> Self {
        if progmem {
            PackagingMode::EmbeddedHeader
        } else {
            PackagingMode::FilesystemImage
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackagingMode::FilesystemImage => "spiffs",
            PackagingMode::EmbeddedHeader => "progmem",
        }
    }
}

impl Default for PackagingMode {
    fn default() -> Self {
        PackagingMode::FilesystemImage
    }
}

impl fmt::Display for PackagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an image about to be flashed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Produced by the image builder during this run
    Built,
    /// Found on disk when no image was built
    PrePlaced,
}

/// The SPIFFS image file handed to the flashing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemImage {
    pub path: PathBuf,
    pub origin: ImageOrigin,
}

impl FilesystemImage {
    pub fn built(path: impl Into<PathBuf>) -> Self {
        FilesystemImage {
            path: path.into(),
            origin: ImageOrigin::Built,
        }
    }

    /// Look for an image left in place before the run; `None` if absent.
    pub fn pre_placed(path: &Path) -> Option<Self> {
        if path.is_file() {
            Some(FilesystemImage {
                path: path.to_path_buf(),
                origin: ImageOrigin::PrePlaced,
            })
        } else {
            None
        }
    }
}

/// Absolute path of the located image-builder executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolBinaryPath(PathBuf);

impl ToolBinaryPath {
    pub fn new(path: PathBuf) -> Self {
        ToolBinaryPath(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl fmt::Display for ToolBinaryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(PackagingMode::from_progmem_flag(true), PackagingMode::EmbeddedHeader);
        assert_eq!(PackagingMode::from_progmem_flag(false), PackagingMode::FilesystemImage);
        assert_eq!(PackagingMode::default(), PackagingMode::FilesystemImage);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(PackagingMode::EmbeddedHeader.to_string(), "progmem");
        assert_eq!(PackagingMode::FilesystemImage.to_string(), "spiffs");
    }

    #[test]
    fn test_pre_placed_image_requires_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let path = dir.path().join("fs.out");
        assert!(FilesystemImage::pre_placed(&path).is_none());

        std::fs::write(&path, b"image").expect("Failed to write image");
        let image = FilesystemImage::pre_placed(&path).expect("image should be detected");
        assert_eq!(image.origin, ImageOrigin::PrePlaced);
        assert_eq!(image.path, path);
    }
}
