//! Error types for matdiff

use std::path::Path;
use thiserror::Error;

/// Errors surfaced by a comparison run
#[derive(Debug, Error)]
pub enum MatdiffError {
    /// Input file is missing, unreadable or not a spreadsheet
    #[error("Load error: {0}")]
    Load(String),

    /// A required column is missing from one of the inputs
    #[error("Schema error: {0}")]
    Schema(String),

    /// Unexpected failure while grouping or diffing
    #[error("Compare error: {0}")]
    Compare(String),

    /// Report could not be written or re-saved
    #[error("Write error: {0}")]
    Write(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl MatdiffError {
    pub fn load<S: Into<String>>(msg: S) -> Self {
        Self::Load(msg.into())
    }

    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::Schema(msg.into())
    }

    pub fn compare<S: Into<String>>(msg: S) -> Self {
        Self::Compare(msg.into())
    }

    pub fn write<S: Into<String>>(msg: S) -> Self {
        Self::Write(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a spreadsheet writer failure for `path` as a write error
    pub fn from_xlsx(error: rust_xlsxwriter::XlsxError, path: &Path) -> Self {
        Self::Write(format!("Failed to write '{}': {error}", path.display()))
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Schema(_) => "schema",
            Self::Compare(_) => "compare",
            Self::Write(_) | Self::Xlsx(_) => "write",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, MatdiffError>;
