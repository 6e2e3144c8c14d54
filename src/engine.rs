//! Binding the pdfium library used to rasterise PDF uploads.
//!
//! Resolution order:
//!
//! 1. An explicit path passed by the caller (CLI `--pdfium-lib`).
//! 2. `PDFIUM_LIB_PATH`.
//! 3. The system library search path.
//!
//! A path may name the library file itself or the directory holding it.
//! Binding is done once at startup; hosts that only accept raster images
//! can skip it altogether.

use crate::error::BlueprintError;
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an existing libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind pdfium, trying `lib_path`, then `PDFIUM_LIB_PATH`, then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, BlueprintError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    match explicit {
        Some(path) => bind_pdfium_from_path(&path),
        None => {
            debug!("No pdfium path given; trying the system library");
            let bindings = Pdfium::bind_to_system_library().map_err(|e| {
                BlueprintError::PdfEngineUnavailable(format!("system library: {e}"))
            })?;
            info!("Bound system pdfium library");
            Ok(Pdfium::new(bindings))
        }
    }
}

/// Bind the pdfium library at `path` (a file, or a directory containing it).
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, BlueprintError> {
    let library = resolve_library_path(path);
    let bindings = Pdfium::bind_to_library(&library).map_err(|e| {
        BlueprintError::PdfEngineUnavailable(format!("'{}': {}", library.display(), e))
    })?;
    info!("Bound pdfium from {}", library.display());
    Ok(Pdfium::new(bindings))
}

/// Expand a directory into the platform library name inside it.
fn resolve_library_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_engine_unavailable() {
        match bind_pdfium_from_path(Path::new("/nonexistent/libpdfium.so")) {
            Err(BlueprintError::PdfEngineUnavailable(msg)) => {
                assert!(msg.contains("/nonexistent/libpdfium.so"), "got: {msg}")
            }
            Err(other) => panic!("expected PdfEngineUnavailable, got {other}"),
            Ok(_) => panic!("bound a library that does not exist"),
        }
    }

    #[test]
    fn directory_expands_to_platform_library() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_library_path(dir.path());
        assert_eq!(resolved.parent(), Some(dir.path()));
        assert!(resolved
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("pdfium")));
    }

    #[test]
    fn file_path_is_used_as_is() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(resolve_library_path(p), p);
    }
}
