use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The three symbol kinds carried by a [`crate::SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Method,
    Field,
}

impl SymbolKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("malformed mapping dataset at line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("conflicting {kind} mapping for {key}: {existing} vs {incoming}")]
    Conflict {
        kind: SymbolKind,
        key: String,
        existing: String,
        incoming: String,
    },
    #[error("malformed type-name correspondence at line {line}: {message}")]
    MalformedCorrespondence { line: usize, message: String },
    #[error("unable to obtain type-name correspondence: {0}")]
    Fetch(#[from] FetchError),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MappingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MappingError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while downloading the external type-name correspondence.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network access is disabled and no cached correspondence exists")]
    NetworkDisabled,
    #[error("HTTP request to {uri} failed: {message}")]
    HttpRequest { uri: String, message: String },
    #[error("HTTP request to {uri} returned status {status}")]
    HttpResponse { uri: String, status: u16 },
    #[error("invalid JSON from {uri}: {source}")]
    InvalidJson {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("platform version {version} is not listed in the version manifest")]
    UnknownVersion { version: String },
    #[error("version {version} has no {download} download")]
    MissingDownload {
        version: String,
        download: &'static str,
    },
    #[error("downloaded correspondence is malformed: {0}")]
    Malformed(String),
    #[error("correspondence halves disagree on {anchor}: {existing} vs {incoming}")]
    Inconsistent {
        anchor: String,
        existing: String,
        incoming: String,
    },
}
