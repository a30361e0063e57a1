// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Field binding: typed, read-on-demand access to one field of a bound
//! message or group entry.
//!
//! A [`BoundField`] is `(descriptor, buffer, base_offset, relative_offset)`;
//! nothing is read until an accessor is called and nothing is copied out
//! of the buffer except the materialized [`SbeValue`].

use std::collections::HashMap;

use crate::core::{CodecError, Result, SbeValue};
use crate::decode::primitive;
use crate::schema::{ConstValue, FieldDescriptor, FieldKind, SbePrimitive};

/// A field descriptor bound to a buffer position.
#[derive(Debug, Clone, Copy)]
pub struct BoundField<'a> {
    desc: &'a FieldDescriptor,
    buffer: &'a [u8],
    /// Message start within the buffer
    base: usize,
    /// Entry-relative displacement (0 for message-level fields)
    relative: usize,
}

impl<'a> BoundField<'a> {
    pub(crate) fn new(
        desc: &'a FieldDescriptor,
        buffer: &'a [u8],
        base: usize,
        relative: usize,
    ) -> Self {
        Self {
            desc,
            buffer,
            base,
            relative,
        }
    }

    /// The field's snake_case name.
    pub fn name(&self) -> &'a str {
        &self.desc.name
    }

    /// The schema's original field name.
    pub fn original_name(&self) -> &'a str {
        &self.desc.original_name
    }

    /// The descriptor this binding reads through.
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        self.desc
    }

    /// Absolute buffer offset this field reads from.
    pub fn read_offset(&self) -> usize {
        self.base + self.relative + self.desc.offset
    }

    /// The encoded value, uninterpreted: no null-sentinel mapping, no
    /// string trimming, enum/set codes as their scalar encoding.
    /// Constants short-circuit without touching the buffer.
    pub fn raw_value(&self) -> Result<SbeValue> {
        match &self.desc.kind {
            FieldKind::Scalar {
                primitive,
                count,
                constant,
                ..
            } => {
                if let Some(constant) = constant {
                    return Ok(const_value(constant));
                }
                self.read_scalar(*primitive, *count)
            }
            FieldKind::Enum { primitive, .. } => read_scalar_value(
                self.buffer,
                self.read_offset(),
                *primitive,
            ),
            FieldKind::Set { primitive, .. } => read_scalar_value(
                self.buffer,
                self.read_offset(),
                *primitive,
            ),
            FieldKind::Composite { parts, .. } => {
                let mut map = HashMap::with_capacity(parts.len());
                for part in parts {
                    let bound = BoundField::new(part, self.buffer, self.base, self.relative);
                    let value = bound.value()?.unwrap_or(SbeValue::Null);
                    map.insert(part.name.clone(), value);
                }
                Ok(SbeValue::Composite(map))
            }
        }
    }

    /// The interpreted value; `None` when the field is null/absent.
    pub fn value(&self) -> Result<Option<SbeValue>> {
        match &self.desc.kind {
            FieldKind::Scalar {
                null_value,
                is_string,
                constant,
                ..
            } => {
                let raw = self.raw_value()?;
                if constant.is_none() {
                    if let (Some(null), Some(raw_int)) = (null_value, raw.as_i128()) {
                        if raw_int == *null {
                            return Ok(None);
                        }
                    }
                }
                if *is_string {
                    if let SbeValue::String(s) = &raw {
                        let trimmed = s.split('\0').next().unwrap_or("");
                        return Ok(Some(SbeValue::String(trimmed.to_string())));
                    }
                }
                Ok(Some(raw))
            }
            FieldKind::Enum { values, .. } => {
                let key = self.raw_value()?.key_string();
                Ok(values.iter().find(|v| v.text == key).map(|v| {
                    SbeValue::String(v.description.clone().unwrap_or_default())
                }))
            }
            FieldKind::Set { choices, .. } => {
                let raw = self.raw_value()?;
                let bits = raw.as_u64().ok_or_else(|| {
                    CodecError::decode(
                        self.read_offset(),
                        format!("set field '{}' has a signed encoding", self.desc.name),
                    )
                })?;
                let width = self.desc.length * 8;
                let mut names = Vec::new();
                for bit in 0..width as u32 {
                    if bits >> bit & 1 == 1 {
                        if let Some(choice) = choices.iter().find(|c| c.bit == bit) {
                            names.push(choice.name.as_str());
                        }
                    }
                }
                Ok(Some(SbeValue::String(names.join(", "))))
            }
            FieldKind::Composite { parts, decimal } => {
                if *decimal {
                    let mantissa = self.part_value(parts, "mantissa")?;
                    let exponent = self.part_value(parts, "exponent")?;
                    match (mantissa, exponent) {
                        (Some(m), Some(e)) => {
                            let mantissa = m.as_f64().ok_or_else(|| {
                                CodecError::decode(
                                    self.read_offset(),
                                    format!("non-numeric mantissa in '{}'", self.desc.name),
                                )
                            })?;
                            let exponent = e.as_i64().ok_or_else(|| {
                                CodecError::decode(
                                    self.read_offset(),
                                    format!("non-numeric exponent in '{}'", self.desc.name),
                                )
                            })?;
                            Ok(Some(SbeValue::Decimal(
                                mantissa * 10f64.powi(exponent as i32),
                            )))
                        }
                        _ => Ok(None),
                    }
                } else {
                    Ok(Some(self.raw_value()?))
                }
            }
        }
    }

    /// For enum fields, the short enumerant name of the current value.
    /// `None` for unknown raw values; `Ok(None)` for non-enum fields.
    pub fn enumerant(&self) -> Result<Option<&'a str>> {
        match &self.desc.kind {
            FieldKind::Enum { values, .. } => {
                let key = self.raw_value()?.key_string();
                Ok(values
                    .iter()
                    .find(|v| v.text == key)
                    .map(|v| v.name.as_str()))
            }
            _ => Ok(None),
        }
    }

    fn part_value(
        &self,
        parts: &'a [FieldDescriptor],
        name: &str,
    ) -> Result<Option<SbeValue>> {
        match parts.iter().find(|p| p.name == name) {
            Some(part) => BoundField::new(part, self.buffer, self.base, self.relative).value(),
            None => Ok(None),
        }
    }

    fn read_scalar(&self, primitive: SbePrimitive, count: usize) -> Result<SbeValue> {
        let offset = self.read_offset();
        if count > 1 {
            if primitive != SbePrimitive::Char {
                return Err(CodecError::unsupported(format!(
                    "fixed arrays of {} (field '{}')",
                    primitive.name(),
                    self.desc.name
                )));
            }
            let bytes = primitive::read_bytes(self.buffer, offset, count)?;
            return Ok(SbeValue::String(
                String::from_utf8_lossy(bytes).into_owned(),
            ));
        }
        read_scalar_value(self.buffer, offset, primitive)
    }
}

/// Read one scalar of the given primitive at an absolute offset.
fn read_scalar_value(buf: &[u8], offset: usize, primitive: SbePrimitive) -> Result<SbeValue> {
    Ok(match primitive {
        SbePrimitive::Char => SbeValue::Char(primitive::read_u8(buf, offset)? as char),
        SbePrimitive::Int8 => SbeValue::Int8(primitive::read_i8(buf, offset)?),
        SbePrimitive::Int16 => SbeValue::Int16(primitive::read_i16(buf, offset)?),
        SbePrimitive::Int32 => SbeValue::Int32(primitive::read_i32(buf, offset)?),
        SbePrimitive::Int64 => SbeValue::Int64(primitive::read_i64(buf, offset)?),
        SbePrimitive::UInt8 => SbeValue::UInt8(primitive::read_u8(buf, offset)?),
        SbePrimitive::UInt16 => SbeValue::UInt16(primitive::read_u16(buf, offset)?),
        SbePrimitive::UInt32 => SbeValue::UInt32(primitive::read_u32(buf, offset)?),
        SbePrimitive::UInt64 => SbeValue::UInt64(primitive::read_u64(buf, offset)?),
        SbePrimitive::Float => SbeValue::Float32(primitive::read_f32(buf, offset)?),
        SbePrimitive::Double => SbeValue::Float64(primitive::read_f64(buf, offset)?),
    })
}

/// Materialize a constant declaration as a value.
fn const_value(constant: &ConstValue) -> SbeValue {
    match constant {
        ConstValue::Char(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => SbeValue::Char(c),
                _ => SbeValue::String(s.clone()),
            }
        }
        ConstValue::Int(i) => SbeValue::Int64(*i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumValue, SetChoice};

    fn scalar_desc(
        name: &str,
        primitive: SbePrimitive,
        count: usize,
        offset: usize,
        null_value: Option<i128>,
        constant: Option<ConstValue>,
    ) -> FieldDescriptor {
        let length = if constant.is_some() {
            0
        } else {
            primitive.size() * count
        };
        FieldDescriptor {
            name: name.to_string(),
            original_name: name.to_string(),
            id: None,
            description: None,
            semantic_type: None,
            since_version: 0,
            offset,
            length,
            kind: FieldKind::Scalar {
                primitive,
                count,
                is_string: primitive == SbePrimitive::Char && count > 1,
                null_value,
                optional: null_value.is_some(),
                constant,
            },
        }
    }

    #[test]
    fn test_scalar_value() {
        let desc = scalar_desc("trade_date", SbePrimitive::UInt16, 1, 2, None, None);
        let buf = [0u8, 0, 0xED, 0x43];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::UInt16(17389));
        assert_eq!(field.value().unwrap(), Some(SbeValue::UInt16(17389)));
    }

    #[test]
    fn test_base_and_relative_offsets() {
        let desc = scalar_desc("x", SbePrimitive::UInt8, 1, 1, None, None);
        let buf = [0u8, 1, 2, 3, 4, 5];
        let field = BoundField::new(&desc, &buf, 2, 1);
        assert_eq!(field.read_offset(), 4);
        assert_eq!(field.raw_value().unwrap(), SbeValue::UInt8(4));
    }

    #[test]
    fn test_null_sentinel() {
        let desc = scalar_desc(
            "security_id",
            SbePrimitive::Int32,
            1,
            0,
            Some(2147483647),
            None,
        );
        let buf = 2147483647i32.to_le_bytes();
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::Int32(2147483647));
        assert_eq!(field.value().unwrap(), None);

        let buf = 23936i32.to_le_bytes();
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.value().unwrap(), Some(SbeValue::Int32(23936)));
    }

    #[test]
    fn test_string_trims_at_nul() {
        let desc = scalar_desc("security_group", SbePrimitive::Char, 6, 0, None, None);
        let buf = b"ES\0\0\0\0";
        let field = BoundField::new(&desc, buf, 0, 0);
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String("ES".to_string()))
        );
        // all-NUL array decodes to the empty string
        let buf = [0u8; 6];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String(String::new()))
        );
    }

    #[test]
    fn test_constant_never_reads_buffer() {
        let desc = scalar_desc(
            "md_entry_type",
            SbePrimitive::Char,
            1,
            0,
            None,
            Some(ConstValue::Char("2".to_string())),
        );
        // empty buffer: a constant read must not touch it
        let field = BoundField::new(&desc, &[], 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::Char('2'));
        assert_eq!(field.value().unwrap(), Some(SbeValue::Char('2')));
    }

    fn enum_desc(primitive: SbePrimitive, values: Vec<(&str, &str, &str)>) -> FieldDescriptor {
        FieldDescriptor {
            name: "e".to_string(),
            original_name: "E".to_string(),
            id: None,
            description: None,
            semantic_type: None,
            since_version: 0,
            offset: 0,
            length: primitive.size(),
            kind: FieldKind::Enum {
                primitive,
                values: values
                    .into_iter()
                    .map(|(text, name, description)| EnumValue {
                        text: text.to_string(),
                        name: name.to_string(),
                        description: Some(description.to_string()),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_enum_value_and_enumerant() {
        let desc = enum_desc(
            SbePrimitive::UInt8,
            vec![
                ("0", "New", "New"),
                ("4", "ResetStatistics", "Reset Statistics"),
            ],
        );
        let buf = [4u8];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::UInt8(4));
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String("Reset Statistics".to_string()))
        );
        assert_eq!(field.enumerant().unwrap(), Some("ResetStatistics"));
    }

    #[test]
    fn test_char_enum() {
        let desc = enum_desc(
            SbePrimitive::Char,
            vec![("0", "Bid", "Bid"), ("1", "Offer", "Offer")],
        );
        let buf = [b'0'];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::Char('0'));
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String("Bid".to_string()))
        );
        assert_eq!(field.enumerant().unwrap(), Some("Bid"));
    }

    #[test]
    fn test_unknown_enum_value_is_absent() {
        let desc = enum_desc(SbePrimitive::UInt8, vec![("0", "New", "New")]);
        let buf = [99u8];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.value().unwrap(), None);
        assert_eq!(field.enumerant().unwrap(), None);
    }

    fn set_desc(choices: Vec<(u32, &str)>) -> FieldDescriptor {
        FieldDescriptor {
            name: "match_event_indicator".to_string(),
            original_name: "MatchEventIndicator".to_string(),
            id: None,
            description: None,
            semantic_type: None,
            since_version: 0,
            offset: 0,
            length: 1,
            kind: FieldKind::Set {
                primitive: SbePrimitive::UInt8,
                choices: choices
                    .into_iter()
                    .map(|(bit, name)| SetChoice {
                        bit,
                        name: name.to_string(),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_set_value_joins_bits_ascending() {
        let desc = set_desc(vec![(0, "LastTradeMsg"), (2, "LastQuoteMsg"), (7, "EndOfEvent")]);
        let buf = [0b1000_0100u8];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.raw_value().unwrap(), SbeValue::UInt8(132));
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String("LastQuoteMsg, EndOfEvent".to_string()))
        );
    }

    #[test]
    fn test_set_unknown_bits_skipped() {
        let desc = set_desc(vec![(0, "LastTradeMsg")]);
        let buf = [0b0000_0011u8];
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(
            field.value().unwrap(),
            Some(SbeValue::String("LastTradeMsg".to_string()))
        );
    }

    fn price_desc(offset: usize, mantissa_null: Option<i128>) -> FieldDescriptor {
        let parts = vec![
            scalar_desc("mantissa", SbePrimitive::Int64, 1, offset, mantissa_null, None),
            scalar_desc(
                "exponent",
                SbePrimitive::Int8,
                1,
                offset + 8,
                None,
                Some(ConstValue::Int(-7)),
            ),
        ];
        FieldDescriptor {
            name: "md_entry_px".to_string(),
            original_name: "MDEntryPx".to_string(),
            id: None,
            description: None,
            semantic_type: None,
            since_version: 0,
            offset,
            length: 8,
            kind: FieldKind::Composite {
                parts,
                decimal: true,
            },
        }
    }

    #[test]
    fn test_decimal_composite() {
        let desc = price_desc(0, None);
        let buf = 2431500000000i64.to_le_bytes();
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.value().unwrap(), Some(SbeValue::Decimal(243150.0)));
    }

    #[test]
    fn test_decimal_with_null_mantissa_is_absent() {
        let desc = price_desc(0, Some(9223372036854775807));
        let buf = 9223372036854775807i64.to_le_bytes();
        let field = BoundField::new(&desc, &buf, 0, 0);
        assert_eq!(field.value().unwrap(), None);
    }

    #[test]
    fn test_plain_composite_maps_parts() {
        let parts = vec![
            scalar_desc("year", SbePrimitive::UInt16, 1, 0, None, None),
            scalar_desc("week", SbePrimitive::UInt8, 1, 2, Some(255), None),
        ];
        let desc = FieldDescriptor {
            name: "maturity".to_string(),
            original_name: "Maturity".to_string(),
            id: None,
            description: None,
            semantic_type: None,
            since_version: 0,
            offset: 0,
            length: 3,
            kind: FieldKind::Composite {
                parts,
                decimal: false,
            },
        };
        let buf = [0xE1, 0x07, 0xFF];
        let field = BoundField::new(&desc, &buf, 0, 0);
        let value = field.value().unwrap().unwrap();
        let map = value.as_composite().unwrap();
        assert_eq!(map.get("year"), Some(&SbeValue::UInt16(2017)));
        // null week maps to Null inside the composite
        assert_eq!(map.get("week"), Some(&SbeValue::Null));
    }

    #[test]
    fn test_truncated_read_is_a_decode_error() {
        let desc = scalar_desc("x", SbePrimitive::UInt64, 1, 0, None, None);
        let buf = [0u8; 4];
        let field = BoundField::new(&desc, &buf, 0, 0);
        let err = field.value().unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
