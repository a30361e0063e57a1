// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Packet framing: template-id dispatch and message-by-message walking.
//!
//! The factory peeks the template id behind the size envelope and block
//! header, binds the matching descriptor, and reports how far to advance.
//! The parser turns that into a lazy, fused iterator over a packet; a
//! decode error ends iteration because the stream cannot be resynced.

use crate::core::{CodecError, Result};
use crate::decode::message::Message;
use crate::decode::primitive;
use crate::schema::Schema;

/// Builds one bound message at a buffer offset.
pub trait MessageFactory {
    /// Bind the message starting at `offset`, returning it together with
    /// its total encoded size (envelope included).
    fn build<'a>(&'a self, buffer: &'a [u8], offset: usize) -> Result<(Message<'a>, usize)>;
}

/// Message factory for MDP 3.0 style buffers: a 2-byte size envelope,
/// then the SBE block header whose template id sits at `offset + 4`.
pub struct MdpMessageFactory {
    schema: Schema,
}

impl MdpMessageFactory {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// The schema this factory dispatches against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl MessageFactory for MdpMessageFactory {
    fn build<'a>(&'a self, buffer: &'a [u8], offset: usize) -> Result<(Message<'a>, usize)> {
        let template_id = primitive::read_u16(buffer, offset + 4).map_err(|_| {
            CodecError::decode(offset, "buffer truncated inside message header")
        })?;

        let desc = self.schema.message(template_id).ok_or_else(|| {
            CodecError::decode(offset, format!("unknown template id {template_id}"))
        })?;

        let message = Message::bind(desc, buffer, offset)?;
        let size = message.message_size();
        Ok((message, size))
    }
}

/// Streaming parser over a packet of concatenated messages.
pub struct SbeParser<F: MessageFactory> {
    factory: F,
}

impl<F: MessageFactory> SbeParser<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// The factory this parser dispatches through.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Iterate messages starting at `offset` (12 skips the MDP packet
    /// header) until the buffer is exhausted. The iterator is lazy,
    /// finite, and fuses after the first error.
    pub fn parse<'a>(&'a self, buffer: &'a [u8], offset: usize) -> MessageIter<'a, F> {
        MessageIter {
            factory: &self.factory,
            buffer,
            offset,
            failed: false,
        }
    }
}

/// Lazy message iterator returned by [`SbeParser::parse`].
pub struct MessageIter<'a, F: MessageFactory> {
    factory: &'a F,
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a, F: MessageFactory> Iterator for MessageIter<'a, F> {
    type Item = Result<Message<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        match self.factory.build(self.buffer, self.offset) {
            Ok((message, size)) => {
                if size == 0 {
                    self.failed = true;
                    return Some(Err(CodecError::decode(
                        self.offset,
                        "message_size is zero; cannot advance",
                    )));
                }
                self.offset += size;
                Some(Ok(message))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
