//! Toolchain discovery: arduino-cli configuration and the mkspiffs binary.

pub mod locator;
pub mod probe;

pub use locator::{DirEntryInfo, DirectoryListing, FsListing, ToolLocator};
pub use probe::{get_toolchain_config, ToolchainConfig};
