use std::path::PathBuf;

use thiserror::Error;

use crate::registry_store::StoreError;

pub type Result<T> = std::result::Result<T, XmlRegError>;

/// Malformed invocations, detected before any file or registry access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("only one of --import, --export and --wipe may be used")]
    ConflictingOperations,
    #[error("one of --import, --export or --wipe is required")]
    NoOperation,
    #[error("no file specified")]
    NoFile,
    #[error("no input hive: use --hive or --input-hive")]
    NoInputHive,
    #[error("no output hive: use --hive or --output-hive")]
    NoOutputHive,
    #[error("every --match needs a following --replace")]
    MatchWithoutReplace,
}

impl UsageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            UsageError::InvalidArguments(_) => 1,
            UsageError::ConflictingOperations => 2,
            UsageError::NoOperation => 3,
            UsageError::NoFile => 4,
            UsageError::NoInputHive => 6,
            UsageError::NoOutputHive => 7,
            UsageError::MatchWithoutReplace => 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum XmlRegError {
    #[error("usage: {0}")]
    Usage(#[from] UsageError),
    #[error("failed to parse {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },
    #[error("{}: root element is '{found}', expected 'fragment'", .file.display())]
    Schema { file: PathBuf, found: String },
    #[error("key does not exist: {key}")]
    NoSuchKey { key: String },
    #[error("path already exists and is a directory: {}", .0.display())]
    TargetIsDirectory(PathBuf),
    #[error("not overwriting existing file {}", .0.display())]
    UserDeclinedOverwrite(PathBuf),
    #[error("failed to write {}: {message}", .file.display())]
    WriteFailed { file: PathBuf, message: String },
    #[error("failed to read {key}: {source}")]
    QueryFailed { key: String, source: StoreError },
    #[error("failed to create key {key}: {source}")]
    CreateKeyFailed { key: String, source: StoreError },
    #[error("failed to write value '{name}' at {key}: {reason}")]
    SetPropertyFailed { key: String, name: String, reason: String },
    #[error("not merging into existing key {key}")]
    UserDeclinedMerge { key: String },
    #[error("failed to delete key {key}: {source}")]
    DeleteKeyFailed { key: String, source: StoreError },
    #[error("failed to delete value '{name}' from {key}: {source}")]
    DeletePropertyFailed { key: String, name: String, source: StoreError },
    #[error("invalid match pattern '{pattern}': {source}")]
    InvalidPattern { pattern: String, source: regex::Error },
    #[error("{0}")]
    GeneralFailure(String),
}

impl XmlRegError {
    /// Positive process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            XmlRegError::Usage(usage) => usage.exit_code(),
            XmlRegError::Parse { .. } => 20,
            XmlRegError::Schema { .. } => 21,
            XmlRegError::NoSuchKey { .. } => 30,
            XmlRegError::TargetIsDirectory(_) => 31,
            XmlRegError::UserDeclinedOverwrite(_) => 32,
            XmlRegError::WriteFailed { .. } => 33,
            XmlRegError::QueryFailed { .. } => 34,
            XmlRegError::CreateKeyFailed { .. } => 40,
            XmlRegError::SetPropertyFailed { .. } => 41,
            XmlRegError::UserDeclinedMerge { .. } => 42,
            XmlRegError::DeleteKeyFailed { .. } => 50,
            XmlRegError::DeletePropertyFailed { .. } => 51,
            XmlRegError::InvalidPattern { .. } => 60,
            XmlRegError::GeneralFailure(_) => 100,
        }
    }
}
