// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory representation of SBE schema `<types>` declarations.
//!
//! The loader turns XML into these definitions; the message builder then
//! resolves them into field descriptors with concrete offsets.

use serde::{Deserialize, Serialize};

use crate::core::{CodecError, Result};

/// Primitive SBE wire types, all little-endian fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbePrimitive {
    /// Single byte character
    Char,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl SbePrimitive {
    /// Size in bytes of one element of this primitive.
    pub const fn size(self) -> usize {
        match self {
            SbePrimitive::Char | SbePrimitive::Int8 | SbePrimitive::UInt8 => 1,
            SbePrimitive::Int16 | SbePrimitive::UInt16 => 2,
            SbePrimitive::Int32 | SbePrimitive::UInt32 | SbePrimitive::Float => 4,
            SbePrimitive::Int64 | SbePrimitive::UInt64 | SbePrimitive::Double => 8,
        }
    }

    /// Resolve one of the 12 primitive names used by SBE schemas.
    ///
    /// `int` is the bare-integer alias some schema generators emit for a
    /// 4-byte signed value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" => Some(SbePrimitive::Char),
            "int" => Some(SbePrimitive::Int32),
            "int8" => Some(SbePrimitive::Int8),
            "int16" => Some(SbePrimitive::Int16),
            "int32" => Some(SbePrimitive::Int32),
            "int64" => Some(SbePrimitive::Int64),
            "uint8" => Some(SbePrimitive::UInt8),
            "uint16" => Some(SbePrimitive::UInt16),
            "uint32" => Some(SbePrimitive::UInt32),
            "uint64" => Some(SbePrimitive::UInt64),
            "float" => Some(SbePrimitive::Float),
            "double" => Some(SbePrimitive::Double),
            _ => None,
        }
    }

    /// Schema-facing name of this primitive.
    pub const fn name(self) -> &'static str {
        match self {
            SbePrimitive::Char => "char",
            SbePrimitive::Int8 => "int8",
            SbePrimitive::Int16 => "int16",
            SbePrimitive::Int32 => "int32",
            SbePrimitive::Int64 => "int64",
            SbePrimitive::UInt8 => "uint8",
            SbePrimitive::UInt16 => "uint16",
            SbePrimitive::UInt32 => "uint32",
            SbePrimitive::UInt64 => "uint64",
            SbePrimitive::Float => "float",
            SbePrimitive::Double => "double",
        }
    }
}

/// Byte order declared by a schema. Only little-endian decoding is
/// exercised; big-endian is representable but rejected by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Parse the schema `byteOrder` attribute.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "littleEndian" => Some(ByteOrder::LittleEndian),
            "bigEndian" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }
}

/// Field presence as declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Presence {
    #[default]
    Required,
    Optional,
    Constant,
}

impl Presence {
    /// Parse the `presence` attribute.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "required" => Some(Presence::Required),
            "optional" => Some(Presence::Optional),
            "constant" => Some(Presence::Constant),
            _ => None,
        }
    }
}

/// A constant declared via `presence="constant"` element text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// Character constants keep the literal text
    Char(String),
    /// Numeric constants are parsed integers
    Int(i64),
}

/// A `<type>` declaration (scalar or fixed char array).
#[derive(Debug, Clone)]
pub struct EncodedType {
    pub name: String,
    pub primitive: SbePrimitive,
    /// Element count for fixed arrays; `None` for a single scalar
    pub length: Option<usize>,
    pub presence: Presence,
    pub null_value: Option<i128>,
    /// Element text for `presence="constant"`
    pub constant_text: Option<String>,
    /// Explicit offset within the enclosing composite, when declared
    pub offset: Option<usize>,
    pub semantic_type: Option<String>,
    pub description: Option<String>,
}

impl EncodedType {
    /// Total encoded length in bytes.
    pub fn byte_length(&self) -> usize {
        self.primitive.size() * self.length.unwrap_or(1)
    }

    /// Resolve the declared constant, if any.
    pub fn constant(&self) -> Result<Option<ConstValue>> {
        if self.presence != Presence::Constant {
            return Ok(None);
        }
        let text = self.constant_text.as_deref().ok_or_else(|| {
            CodecError::schema(
                format!("type '{}'", self.name),
                "presence=\"constant\" without element text",
            )
        })?;
        if self.primitive == SbePrimitive::Char {
            Ok(Some(ConstValue::Char(text.to_string())))
        } else {
            let value = text.trim().parse::<i64>().map_err(|_| {
                CodecError::schema(
                    format!("type '{}'", self.name),
                    format!("invalid constant value '{text}'"),
                )
            })?;
            Ok(Some(ConstValue::Int(value)))
        }
    }
}

/// A single `<validValue>` of an enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Encoded representation as text (decimal integer or single char)
    pub text: String,
    /// Short enumerant name
    pub name: String,
    /// Human-readable description
    pub description: Option<String>,
}

/// An `<enum>` declaration.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    /// Encoding type name; either a primitive or a named `<type>`
    pub encoding_type: String,
    pub values: Vec<EnumValue>,
    pub semantic_type: Option<String>,
    pub description: Option<String>,
}

/// A single `<choice>` of a bit set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetChoice {
    /// Bit position within the encoded integer
    pub bit: u32,
    pub name: String,
}

/// A `<set>` declaration.
#[derive(Debug, Clone)]
pub struct SetType {
    pub name: String,
    pub encoding_type: String,
    pub choices: Vec<SetChoice>,
    pub semantic_type: Option<String>,
    pub description: Option<String>,
}

/// A `<composite>` declaration: an ordered sequence of encoded parts.
#[derive(Debug, Clone)]
pub struct CompositeType {
    pub name: String,
    pub parts: Vec<EncodedType>,
    pub semantic_type: Option<String>,
    pub description: Option<String>,
}

impl CompositeType {
    /// Encoded size in bytes. Parts pack sequentially unless one declares
    /// an explicit offset, which moves the running position forward.
    /// Constant parts occupy no wire bytes.
    pub fn byte_length(&self) -> usize {
        let mut running = 0usize;
        for part in &self.parts {
            if part.presence == Presence::Constant {
                continue;
            }
            if let Some(offset) = part.offset {
                running = offset;
            }
            running += part.byte_length();
        }
        running
    }

    /// Decimal composites are detected by the presence of a part named
    /// `mantissa`. This is the single place the heuristic lives.
    pub fn is_decimal(&self) -> bool {
        self.parts.iter().any(|p| p.name == "mantissa")
    }

    /// Find a part by its schema name.
    pub fn part(&self, name: &str) -> Option<&EncodedType> {
        self.parts.iter().find(|p| p.name == name)
    }
}

/// Any named declaration under `<types>`.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Encoded(EncodedType),
    Enum(EnumType),
    Set(SetType),
    Composite(CompositeType),
}

impl TypeDef {
    /// Declared name of this type.
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Encoded(t) => &t.name,
            TypeDef::Enum(t) => &t.name,
            TypeDef::Set(t) => &t.name,
            TypeDef::Composite(t) => &t.name,
        }
    }
}

/// Convert a camelCase schema identifier to the snake_case spelling used
/// throughout the decoder (`NoMDEntries` -> `no_md_entries`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars
                .get(i + 1)
                .map(|n| n.is_ascii_lowercase())
                .unwrap_or(false);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
