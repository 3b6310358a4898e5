//! Error types for FastConvert2Bed
//!
//! Every failure a conversion run can hit, plus the `sysexits.h` status
//! each one is reported with.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status codes from BSD `sysexits.h`
pub mod sysexits {
    pub const EX_OK: u8 = 0;
    pub const EX_USAGE: u8 = 64;
    pub const EX_DATAERR: u8 = 65;
    pub const EX_NOINPUT: u8 = 66;
    pub const EX_SOFTWARE: u8 = 70;
    pub const EX_OSFILE: u8 = 72;
    pub const EX_IOERR: u8 = 74;
    pub const EX_CONFIG: u8 = 78;
}

/// Main error type for conversion runs
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Bad command-line combination
    #[error("{0}")]
    Usage(String),

    /// A record violates its format's column or coordinate contract
    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// CIGAR string contains an unknown operation or unparseable residue
    #[error("CIGAR string {cigar} contains an error -> illegal operation: {op}")]
    InvalidCigarOperation { cigar: String, op: String },

    /// CIGAR string has no operations
    #[error("CIGAR string not set: cannot calculate read length")]
    EmptyCigar,

    /// Read-consuming CIGAR operations do not add up to the SEQ length
    #[error("CIGAR string's sum of lengths of M/I/S/=/X operations ({expected}) not equal to SEQ length ({found})")]
    SeqCigarMismatch { expected: u64, found: u64 },

    /// Optional field key is neither specified, reserved nor allowlisted
    #[error("Appended tag ({0}) is not valid per SAMtools specification; consider using --custom-tags <value>")]
    InvalidSamTag(String),

    /// VCF data row cannot be mapped onto the header columns
    #[error("Could not map data values to VCF header keys at line {line}: {message}")]
    HeaderMappingError { line: usize, message: String },

    /// Required external binary is not on PATH
    #[error("The {0} binary could not be found in your user PATH -- please locate and install this binary")]
    MissingExternalTool(String),

    /// Standard input is neither a pipe nor a regular file
    #[error("Please redirect or pipe in {0}-formatted data")]
    NoInputAvailable(String),

    /// Platform cannot host the external pipeline
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// One or more external stages exited non-zero
    #[error("Pipeline stage(s) failed: {}", .0.join(", "))]
    StageFailed(Vec<String>),

    /// Input file could not be opened
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// A worker thread died without reporting
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Exit status reported for this error
    pub fn exit_code(&self) -> u8 {
        use sysexits::*;
        match self {
            ConvertError::Usage(_) => EX_USAGE,
            ConvertError::MalformedRecord { .. }
            | ConvertError::InvalidCigarOperation { .. }
            | ConvertError::EmptyCigar
            | ConvertError::SeqCigarMismatch { .. }
            | ConvertError::InvalidSamTag(_)
            | ConvertError::HeaderMappingError { .. } => EX_DATAERR,
            ConvertError::NoInputAvailable(_) | ConvertError::InputNotFound(_) => EX_NOINPUT,
            ConvertError::MissingExternalTool(_) => EX_OSFILE,
            ConvertError::UnsupportedEnvironment(_) => EX_CONFIG,
            ConvertError::StageFailed(_) | ConvertError::Io(_) => EX_IOERR,
            ConvertError::Internal(_) => EX_SOFTWARE,
        }
    }

    /// True for errors caused by the input data itself
    pub fn is_data_error(&self) -> bool {
        self.exit_code() == sysexits::EX_DATAERR
    }

    /// Shorthand for a malformed record at `line`
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        ConvertError::MalformedRecord {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for conversion operations
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
