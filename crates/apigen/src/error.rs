//! Error types for stub generation

use apigen_classfile::{ClassFormatError, DescriptorError, EncodeError};
use thiserror::Error;

/// Errors raised while classifying or stubbing a class
#[derive(Debug, Error)]
pub enum ApiGenError {
    /// The class exposes types outside the allowed packages
    #[error("{0}")]
    InvalidPublicApi(String),

    /// Failed to read class bytes from a reader
    #[error("Failed to read class data: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not a well-formed class file
    #[error("Malformed class file: {0}")]
    ClassFormat(#[from] ClassFormatError),

    /// The stub could not be encoded
    #[error("Failed to emit stub class: {0}")]
    Encode(#[from] EncodeError),
}

impl From<DescriptorError> for ApiGenError {
    fn from(error: DescriptorError) -> Self {
        ApiGenError::ClassFormat(ClassFormatError::Descriptor(error))
    }
}

/// Result alias for stub generation
pub type Result<T> = std::result::Result<T, ApiGenError>;
