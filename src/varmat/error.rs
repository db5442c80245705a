//! Error type for the variant matrix pipeline.

use std::path::PathBuf;

/// Errors that abort a variant matrix run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required column is absent from an input or key file header.
    #[error("required column '{column}' not found in {}", .path.display())]
    MissingColumn {
        /// Name of the missing column.
        column: String,
        /// Path of the offending file.
        path: PathBuf,
    },
    /// Conflicting or unsupported combination of mode options.
    #[error("invalid mode configuration: {0}")]
    InvalidModeConfiguration(String),
    /// A file could not be opened or created.
    #[error("problem accessing {}: {source}", .path.display())]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file could not be parsed or written as TSV.
    #[error("problem with TSV file {}: {source}", .path.display())]
    Csv {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },
}

impl Error {
    /// Construct [`Error::Io`] for `path`.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Construct [`Error::Csv`] for `path`.
    pub fn csv<P: Into<PathBuf>>(path: P, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
