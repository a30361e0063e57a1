// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Zero-copy decoding against a resolved schema.
//!
//! Layers, bottom up:
//! - `primitive`: checked little-endian reads over `(buffer, offset)`
//! - `field`: typed per-field accessors (scalar/string/enum/set/composite)
//! - `group`: repeating-group overlay with nested-group accounting
//! - `message`: header capture, envelope validation, group walk
//! - `parser`: template-id dispatch and packet framing
//!
//! Bound messages and group cursors borrow the caller's buffer; the core
//! never copies or mutates input. Two simultaneous cursors over the same
//! group are outside the contract; finish one traversal (or snapshot via
//! `as_values`) before starting another.

pub mod field;
pub mod group;
pub mod message;
pub mod parser;
pub mod primitive;

pub use field::BoundField;
pub use group::{BoundGroup, GroupCursor, GroupEntries, GroupEntry};
pub use message::Message;
pub use parser::{MdpMessageFactory, MessageFactory, MessageIter, SbeParser};
