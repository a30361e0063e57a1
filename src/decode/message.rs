// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message binding.
//!
//! A [`Message`] overlays a message descriptor onto `(buffer, offset)`:
//! it reads the header version for gating, validates the declared
//! `message_size` against the buffer, and walks the repeating groups once
//! so group access afterwards is positional. Field reads stay lazy.

use crate::core::{CodecError, Result};
use crate::decode::field::BoundField;
use crate::decode::group::BoundGroup;
use crate::schema::MessageDescriptor;

/// A message bound to a buffer position. Borrows both the schema
/// descriptor and the input buffer; no field value outlives either.
#[derive(Debug)]
pub struct Message<'a> {
    desc: &'a MessageDescriptor,
    buffer: &'a [u8],
    offset: usize,
    version: u64,
    message_size: usize,
    groups: Vec<BoundGroup<'a>>,
}

impl<'a> Message<'a> {
    /// Bind `desc` at `offset`. Reads the header, checks the envelope
    /// size against the buffer, and binds all non-gated groups.
    pub fn bind(desc: &'a MessageDescriptor, buffer: &'a [u8], offset: usize) -> Result<Self> {
        let version = match desc.field("version") {
            Some(field) => BoundField::new(field, buffer, offset, 0)
                .raw_value()?
                .as_u64()
                .unwrap_or(0),
            None => 0,
        };

        let declared_size = match desc.field("message_size") {
            Some(field) => BoundField::new(field, buffer, offset, 0)
                .raw_value()?
                .as_u64()
                .map(|v| v as usize),
            None => None,
        };

        if let Some(size) = declared_size {
            let end = offset.checked_add(size).ok_or_else(|| {
                CodecError::decode(offset, "message size overflows the address space")
            })?;
            if end > buffer.len() {
                return Err(CodecError::decode(
                    offset,
                    format!(
                        "message of {size} bytes extends past end of buffer ({} bytes)",
                        buffer.len()
                    ),
                ));
            }
        }

        let mut groups = Vec::with_capacity(desc.groups.len());
        let mut group_offset = desc.header_size + desc.schema_block_length;
        for group_desc in &desc.groups {
            if group_desc.since_version > version {
                continue;
            }
            let bound = BoundGroup::bind(group_desc, buffer, offset, group_offset, version)?;
            group_offset += bound.size();
            groups.push(bound);
        }

        // Without an envelope the message spans header + body + groups.
        let message_size = declared_size.unwrap_or(group_offset);

        Ok(Message {
            desc,
            buffer,
            offset,
            version,
            message_size,
            groups,
        })
    }

    /// Template id of this message.
    pub fn template_id(&self) -> u16 {
        self.desc.template_id
    }

    /// Message name from the schema.
    pub fn name(&self) -> &'a str {
        &self.desc.name
    }

    /// Schema version read from the header.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total encoded size of this message, envelope included.
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Buffer offset this message starts at.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The descriptor this message reads through.
    pub fn descriptor(&self) -> &'a MessageDescriptor {
        self.desc
    }

    /// Look up a header or body field by snake_case name, honoring
    /// version gating.
    pub fn field(&self, name: &str) -> Option<BoundField<'a>> {
        let desc = self.desc.field(name)?;
        if desc.since_version > self.version {
            return None;
        }
        Some(BoundField::new(desc, self.buffer, self.offset, 0))
    }

    /// Look up a bound group by snake_case name. Gated groups are absent.
    pub fn group(&self, name: &str) -> Option<&BoundGroup<'a>> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// All bound groups in wire order.
    pub fn groups(&self) -> &[BoundGroup<'a>] {
        &self.groups
    }
}
