// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for sbecodec.
//!
//! Provides error types for the decoding pipeline:
//! - Schema loading and layout construction
//! - Buffer framing and field decoding
//! - Security-definition file parsing

use std::fmt;

/// Errors that can occur while loading schemas or decoding buffers.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Malformed or inconsistent schema
    Schema {
        /// What was being processed (type, message, attribute, ...)
        context: String,
        /// Error message
        message: String,
    },

    /// Buffer could not be decoded against the schema
    Decode {
        /// Byte offset into the source buffer where decoding failed
        offset: usize,
        /// Error message
        message: String,
    },

    /// Underlying I/O failure while reading an input file
    Io {
        /// File or operation the failure belongs to
        context: String,
        /// Error message
        message: String,
    },

    /// Malformed security-definition record
    SecDef {
        /// 1-based line number in the secdef file
        line: usize,
        /// Error message
        message: String,
    },

    /// Unsupported schema or decoder feature
    Unsupported {
        /// What is not supported
        feature: String,
    },
}

impl CodecError {
    /// Create a schema error.
    pub fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::Schema {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a decode error anchored at a buffer offset.
    pub fn decode(offset: usize, message: impl Into<String>) -> Self {
        CodecError::Decode {
            offset,
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::Io {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a security-definition parse error.
    pub fn secdef(line: usize, message: impl Into<String>) -> Self {
        CodecError::SecDef {
            line,
            message: message.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        CodecError::Unsupported {
            feature: feature.into(),
        }
    }

    /// The buffer offset associated with a decode error, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodecError::Decode { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Schema { context, message } => {
                write!(f, "Schema error in {context}: {message}")
            }
            CodecError::Decode { offset, message } => {
                write!(f, "Decode error at offset {offset}: {message}")
            }
            CodecError::Io { context, message } => {
                write!(f, "I/O error in {context}: {message}")
            }
            CodecError::SecDef { line, message } => {
                write!(f, "Secdef error on line {line}: {message}")
            }
            CodecError::Unsupported { feature } => {
                write!(f, "Unsupported feature: '{feature}'")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io {
            context: "io".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for sbecodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
