// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded value type system.
//!
//! Provides a unified value representation for fields decoded from SBE
//! buffers: scalars, fixed char-array strings, enum/set renderings,
//! mantissa-exponent decimals, and composite maps. All variants are
//! serde-serializable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unified value type for decoded SBE data.
///
/// # Design Principles
///
/// - **Serde support**: All variants are serializable for downstream processing
/// - **Owned types**: Uses owned `String` for clarity; zero-copy access is
///   the job of the field binder, not of materialized values
/// - **Absence is external**: a missing/null field is `Option::None` at the
///   accessor level; `Null` only appears inside composite maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SbeValue {
    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float32(f32),
    Float64(f64),

    // Single character (SBE `char`, enum encodings)
    Char(char),

    // Fixed char-array strings, enum descriptions, set choice lists
    String(String),

    // Mantissa x 10^exponent composites
    Decimal(f64),

    // Plain composite: child name -> decoded value
    Composite(HashMap<String, SbeValue>),

    // Null sentinel for absent parts inside composites
    Null,
}

impl SbeValue {
    /// Check if this value is an integer type (signed or unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SbeValue::Int8(_)
                | SbeValue::Int16(_)
                | SbeValue::Int32(_)
                | SbeValue::Int64(_)
                | SbeValue::UInt8(_)
                | SbeValue::UInt16(_)
                | SbeValue::UInt32(_)
                | SbeValue::UInt64(_)
        )
    }

    /// Check if this value is a floating-point or decimal type.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            SbeValue::Float32(_) | SbeValue::Float64(_) | SbeValue::Decimal(_)
        )
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SbeValue::Null)
    }

    /// Try to convert this value to f64 (numeric and decimal values only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SbeValue::Int8(v) => Some(*v as f64),
            SbeValue::Int16(v) => Some(*v as f64),
            SbeValue::Int32(v) => Some(*v as f64),
            SbeValue::Int64(v) => Some(*v as f64),
            SbeValue::UInt8(v) => Some(*v as f64),
            SbeValue::UInt16(v) => Some(*v as f64),
            SbeValue::UInt32(v) => Some(*v as f64),
            SbeValue::UInt64(v) => Some(*v as f64),
            SbeValue::Float32(v) => Some(*v as f64),
            SbeValue::Float64(v) => Some(*v),
            SbeValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert this value to i64 (integer types only).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SbeValue::Int8(v) => Some(*v as i64),
            SbeValue::Int16(v) => Some(*v as i64),
            SbeValue::Int32(v) => Some(*v as i64),
            SbeValue::Int64(v) => Some(*v),
            SbeValue::UInt8(v) => Some(*v as i64),
            SbeValue::UInt16(v) => Some(*v as i64),
            SbeValue::UInt32(v) => Some(*v as i64),
            SbeValue::UInt64(v) => {
                if *v <= i64::MAX as u64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Try to convert this value to u64 (non-negative integers only).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SbeValue::UInt8(v) => Some(*v as u64),
            SbeValue::UInt16(v) => Some(*v as u64),
            SbeValue::UInt32(v) => Some(*v as u64),
            SbeValue::UInt64(v) => Some(*v),
            SbeValue::Int8(v) if *v >= 0 => Some(*v as u64),
            SbeValue::Int16(v) if *v >= 0 => Some(*v as u64),
            SbeValue::Int32(v) if *v >= 0 => Some(*v as u64),
            SbeValue::Int64(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    /// Widened signed view of any integer variant, for null-sentinel checks.
    pub(crate) fn as_i128(&self) -> Option<i128> {
        match self {
            SbeValue::Int8(v) => Some(*v as i128),
            SbeValue::Int16(v) => Some(*v as i128),
            SbeValue::Int32(v) => Some(*v as i128),
            SbeValue::Int64(v) => Some(*v as i128),
            SbeValue::UInt8(v) => Some(*v as i128),
            SbeValue::UInt16(v) => Some(*v as i128),
            SbeValue::UInt32(v) => Some(*v as i128),
            SbeValue::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Try to get the inner string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SbeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner character.
    pub fn as_char(&self) -> Option<char> {
        match self {
            SbeValue::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Try to get the inner composite map.
    pub fn as_composite(&self) -> Option<&HashMap<String, SbeValue>> {
        match self {
            SbeValue::Composite(map) => Some(map),
            _ => None,
        }
    }

    /// Render this value the way enum/set lookup tables key their entries:
    /// chars as the bare character, integers in decimal.
    pub(crate) fn key_string(&self) -> String {
        match self {
            SbeValue::Char(c) => c.to_string(),
            other => other.to_string(),
        }
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            SbeValue::Int8(_) => "int8",
            SbeValue::Int16(_) => "int16",
            SbeValue::Int32(_) => "int32",
            SbeValue::Int64(_) => "int64",
            SbeValue::UInt8(_) => "uint8",
            SbeValue::UInt16(_) => "uint16",
            SbeValue::UInt32(_) => "uint32",
            SbeValue::UInt64(_) => "uint64",
            SbeValue::Float32(_) => "float",
            SbeValue::Float64(_) => "double",
            SbeValue::Char(_) => "char",
            SbeValue::String(_) => "string",
            SbeValue::Decimal(_) => "decimal",
            SbeValue::Composite(_) => "composite",
            SbeValue::Null => "null",
        }
    }
}

impl fmt::Display for SbeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SbeValue::Int8(v) => write!(f, "{v}"),
            SbeValue::Int16(v) => write!(f, "{v}"),
            SbeValue::Int32(v) => write!(f, "{v}"),
            SbeValue::Int64(v) => write!(f, "{v}"),
            SbeValue::UInt8(v) => write!(f, "{v}"),
            SbeValue::UInt16(v) => write!(f, "{v}"),
            SbeValue::UInt32(v) => write!(f, "{v}"),
            SbeValue::UInt64(v) => write!(f, "{v}"),
            SbeValue::Float32(v) => write!(f, "{v}"),
            SbeValue::Float64(v) => write!(f, "{v}"),
            SbeValue::Char(v) => write!(f, "{v}"),
            SbeValue::String(v) => write!(f, "{v}"),
            SbeValue::Decimal(v) => write!(f, "{v}"),
            SbeValue::Composite(v) => write!(f, "{{{} parts}}", v.len()),
            SbeValue::Null => write!(f, "null"),
        }
    }
}
