//! Error types for the hardware inventory engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting and merging hardware inventory
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Precondition Errors
    // =========================================================================
    /// Collection was started without a device to populate
    #[error("device is missing, nothing to collect into")]
    DeviceMissing,

    // =========================================================================
    // Identification Errors
    // =========================================================================
    /// No collector or updater is known for the vendor/model/class tuple
    #[error("{kind} utility not identified for vendor: {vendor}")]
    UtilityNotIdentified { kind: String, vendor: String },

    // =========================================================================
    // Tool Invocation Errors
    // =========================================================================
    /// The utility binary could not be found
    #[error("executable not found: {program}")]
    ExecutableNotFound { program: String },

    /// The utility exited with a non-zero status
    #[error("command '{command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The utility did not complete within the configured timeout
    #[error("command '{command}' timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    /// The caller cancelled the collection while a utility was running
    #[error("operation cancelled")]
    Cancelled,

    // =========================================================================
    // Parse Errors
    // =========================================================================
    /// Utility output could not be parsed into component records
    #[error("failed to parse {utility} output: {reason}")]
    Parse { utility: String, reason: String },

    // =========================================================================
    // Collection Errors
    // =========================================================================
    /// A component class collector reported an error
    #[error("{class} collection failed: {source}")]
    Collector {
        class: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Merge Errors
    // =========================================================================
    /// A field-level diff could not be computed
    #[error("diff failed at '{path}': {reason}")]
    Diff { path: String, reason: String },

    /// A change could not be applied to the target record
    #[error("patch failed at '{path}': {reason}")]
    Patch { path: String, reason: String },

    // =========================================================================
    // Ambient Errors
    // =========================================================================
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Build an identification failure.
    pub fn not_identified(kind: impl Into<String>, vendor: impl Into<String>) -> Self {
        Error::UtilityNotIdentified {
            kind: kind.into(),
            vendor: vendor.into(),
        }
    }

    /// Build a parse failure for the named utility.
    pub fn parse(utility: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            utility: utility.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error with the component class it was raised for.
    pub fn collector(class: impl Into<String>, source: Error) -> Self {
        Error::Collector {
            class: class.into(),
            source: Box::new(source),
        }
    }

    /// True for the routine "no utility for this vendor" outcome.
    pub fn is_identification_failure(&self) -> bool {
        match self {
            Error::UtilityNotIdentified { .. } => true,
            Error::Collector { source, .. } => source.is_identification_failure(),
            _ => false,
        }
    }
}
