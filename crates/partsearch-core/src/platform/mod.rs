//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live under this module:
//! - `paths` - data directories, per-root store locations and canonical keys
//! - `roots` - discovery of useful starting directories for indexing and crawling

pub mod paths;
pub mod roots;

pub use paths::{canonical_key, display_path, store_dir_for_root, DataPaths};
pub use roots::candidate_roots;

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}
