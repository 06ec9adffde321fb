use std::path::PathBuf;

use thiserror::Error;

/// Fatal reconciliation errors, raised before any file is touched.
///
/// Per-file problems (missing matches, failed deletes) are never errors;
/// they are tallied in the report.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{kind} directory not found: {}", .path.display())]
    MissingDirectory { kind: &'static str, path: PathBuf },

    #[error("{kind} path is not a directory: {}", .path.display())]
    NotADirectory { kind: &'static str, path: PathBuf },
}
