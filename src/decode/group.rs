// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Repeating-group binding.
//!
//! A [`BoundGroup`] overlays one group occurrence onto the buffer: it
//! reads the dimension composite, computes every entry's offset (nested
//! groups push later entries outward), and records the total consumed
//! size. Entry access is positional and cheap; cursors re-walk nothing.

use std::collections::HashMap;

use crate::core::{CodecError, Result, SbeValue};
use crate::decode::field::BoundField;
use crate::schema::GroupDescriptor;

/// One entry's resolved position plus its nested group bindings.
#[derive(Debug)]
struct EntryLayout<'a> {
    /// Entry start relative to the message start
    offset: usize,
    nested: Vec<BoundGroup<'a>>,
}

/// A repeating group bound to a buffer position.
#[derive(Debug)]
pub struct BoundGroup<'a> {
    desc: &'a GroupDescriptor,
    buffer: &'a [u8],
    /// Message start within the buffer
    base: usize,
    /// Message schema version, for entry-field gating
    version: u64,
    /// Entry block length read from the dimension
    block_length: usize,
    entries: Vec<EntryLayout<'a>>,
    /// Total bytes consumed: dimension + entries + nested groups
    size: usize,
}

impl<'a> BoundGroup<'a> {
    /// Overlay `desc` starting at `group_start` (relative to the message
    /// at `base`). Reads the dimension, then lays out each entry followed
    /// by its nested groups.
    pub(crate) fn bind(
        desc: &'a GroupDescriptor,
        buffer: &'a [u8],
        base: usize,
        group_start: usize,
        version: u64,
    ) -> Result<Self> {
        let block_length_field =
            BoundField::new(&desc.dimension.block_length, buffer, base, group_start);
        let num_in_group_field =
            BoundField::new(&desc.dimension.num_in_group, buffer, base, group_start);

        let block_length = read_dimension(&block_length_field, base + group_start)?;
        let num_in_group = read_dimension(&num_in_group_field, base + group_start)?;

        let mut entries = Vec::with_capacity(num_in_group);
        let mut repeated_offset = group_start + desc.dimension.size;
        let mut nested_len = 0usize;

        for _ in 0..num_in_group {
            let entry_offset = repeated_offset + nested_len;
            repeated_offset += block_length;

            let mut nested = Vec::with_capacity(desc.groups.len());
            for nested_desc in &desc.groups {
                if nested_desc.since_version > version {
                    continue;
                }
                let nested_start = repeated_offset + nested_len;
                let bound = BoundGroup::bind(nested_desc, buffer, base, nested_start, version)?;
                nested_len += bound.size();
                nested.push(bound);
            }
            entries.push(EntryLayout {
                offset: entry_offset,
                nested,
            });
        }

        let size = desc.dimension.size + num_in_group * block_length + nested_len;
        let end = base + group_start + size;
        if end > buffer.len() {
            return Err(CodecError::decode(
                base + group_start,
                format!(
                    "group '{}' extends to byte {end} past end of buffer ({} bytes)",
                    desc.name,
                    buffer.len()
                ),
            ));
        }

        Ok(BoundGroup {
            desc,
            buffer,
            base,
            version,
            block_length,
            entries,
            size,
        })
    }

    /// The group's snake_case name.
    pub fn name(&self) -> &'a str {
        &self.desc.name
    }

    /// The descriptor this binding reads through.
    pub fn descriptor(&self) -> &'a GroupDescriptor {
        self.desc
    }

    /// Entry block length read from the dimension.
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Number of entries read from the dimension.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Total bytes this group consumed, nested groups included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Positional entry access.
    pub fn entry(&self, index: usize) -> Option<GroupEntry<'a, '_>> {
        if index < self.entries.len() {
            Some(GroupEntry { group: self, index })
        } else {
            None
        }
    }

    /// Iterate entries in wire order.
    pub fn entries(&self) -> GroupEntries<'a, '_> {
        GroupEntries {
            group: self,
            next: 0,
        }
    }

    /// An explicit cursor over the entries. Sequential re-iteration is
    /// fine (create a new cursor); concurrent cursors over one group are
    /// outside the contract.
    pub fn cursor(&self) -> GroupCursor<'a, '_> {
        GroupCursor {
            group: self,
            current: None,
        }
    }
}

fn read_dimension(field: &BoundField<'_>, group_offset: usize) -> Result<usize> {
    let value = field.raw_value()?;
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| {
            CodecError::decode(
                group_offset,
                format!("dimension field '{}' is not an unsigned integer", field.name()),
            )
        })
}

/// A view over one group entry.
#[derive(Debug, Clone, Copy)]
pub struct GroupEntry<'a, 'g> {
    group: &'g BoundGroup<'a>,
    index: usize,
}

impl<'a, 'g> GroupEntry<'a, 'g> {
    /// Index of this entry within the group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Entry start relative to the message start.
    pub fn offset(&self) -> usize {
        self.group.entries[self.index].offset
    }

    /// Look up an entry field, honoring version gating.
    pub fn field(&self, name: &str) -> Option<BoundField<'a>> {
        let desc = self.group.desc.field(name)?;
        if desc.since_version > self.group.version {
            return None;
        }
        Some(BoundField::new(
            desc,
            self.group.buffer,
            self.group.base,
            self.offset(),
        ))
    }

    /// This entry's instance of a nested group.
    pub fn group(&self, name: &str) -> Option<&'g BoundGroup<'a>> {
        self.group.entries[self.index]
            .nested
            .iter()
            .find(|g| g.name() == name)
    }

    /// All nested group instances attached to this entry.
    pub fn groups(&self) -> &'g [BoundGroup<'a>] {
        &self.group.entries[self.index].nested
    }

    /// Materialize every (non-gated) field of this entry into an owned
    /// snapshot, for callers that outlive the traversal.
    pub fn as_values(&self) -> Result<HashMap<String, Option<SbeValue>>> {
        let mut out = HashMap::with_capacity(self.group.desc.fields.len());
        for desc in &self.group.desc.fields {
            if desc.since_version > self.group.version {
                continue;
            }
            let bound = BoundField::new(desc, self.group.buffer, self.group.base, self.offset());
            out.insert(desc.name.clone(), bound.value()?);
        }
        Ok(out)
    }
}

/// Iterator over group entries.
pub struct GroupEntries<'a, 'g> {
    group: &'g BoundGroup<'a>,
    next: usize,
}

impl<'a, 'g> Iterator for GroupEntries<'a, 'g> {
    type Item = GroupEntry<'a, 'g>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.group.entry(self.next)?;
        self.next += 1;
        Some(entry)
    }
}

/// Explicit entry cursor with a current position.
pub struct GroupCursor<'a, 'g> {
    group: &'g BoundGroup<'a>,
    current: Option<usize>,
}

impl<'a, 'g> GroupCursor<'a, 'g> {
    /// Advance to the next entry, returning it.
    pub fn next(&mut self) -> Option<GroupEntry<'a, 'g>> {
        let next = self.current.map_or(0, |i| i + 1);
        let entry = self.group.entry(next)?;
        self.current = Some(next);
        Some(entry)
    }

    /// The entry the cursor currently points at.
    pub fn current(&self) -> Option<GroupEntry<'a, 'g>> {
        self.current.and_then(|i| self.group.entry(i))
    }

    /// Snapshot the current entry's fields into owned values.
    pub fn current_as_values(&self) -> Result<Option<HashMap<String, Option<SbeValue>>>> {
        match self.current() {
            Some(entry) => Ok(Some(entry.as_values()?)),
            None => Ok(None),
        }
    }
}
