// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Sbecodec
//!
//! Schema-driven decoder for Simple Binary Encoding market data, with an
//! incremental-refresh order-book engine for CME MDP 3.0 style feeds.
//!
//! This library provides:
//! - **[`Schema`]** - XML template loading resolved into offset-bearing
//!   message descriptors (or loaded from a serialized artifact)
//! - **[`SbeParser`]** / **[`MdpMessageFactory`]** - packet framing and
//!   template-id dispatch over borrowed buffers
//! - **[`Message`]** - zero-copy field and repeating-group access
//! - **[`OrderBook`]** / **[`PacketProcessor`]** - per-instrument depth
//!   books fed by incremental refresh and trade-summary messages
//! - **[`SecDef`]** - security-definition lookup (symbol, depth)
//!
//! ## Example: Decoding a packet
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sbecodec::{MdpMessageFactory, SbeParser, Schema};
//!
//! let schema = Schema::parse("templates_FixBinary.xml")?;
//! let parser = SbeParser::new(MdpMessageFactory::new(schema));
//!
//! let packet: Vec<u8> = std::fs::read("packet.bin")?;
//! // MDP packets carry a 12-byte header before the first message
//! for message in parser.parse(&packet, 12) {
//!     let message = message?;
//!     println!("{} ({})", message.name(), message.template_id());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Building books
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sbecodec::{
//!     MdpMessageFactory, PacketProcessor, SbeParser, Schema, SecDef,
//! };
//!
//! let schema = Schema::parse("templates_FixBinary.xml")?;
//! let parser = SbeParser::new(MdpMessageFactory::new(schema));
//! let secdef = SecDef::load("secdef.dat.gz")?;
//!
//! let mut processor = PacketProcessor::new(parser, secdef);
//! let payload: Vec<u8> = std::fs::read("packet.bin")?;
//! processor.handle_packet(0, &payload);
//! # Ok(())
//! # }
//! ```
//!
//! Decoding borrows the caller's buffer and never copies or mutates it;
//! a bound [`Message`] must not outlive the buffer it was bound to.

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{CodecError, Result, SbeValue};

// Schema model, loading, and artifacts
pub mod schema;

pub use schema::{
    FieldDescriptor, FieldKind, GroupDescriptor, MessageDescriptor, Schema, SchemaArtifact,
    SchemaConfig,
};

// Zero-copy decoding
pub mod decode;

pub use decode::{
    BoundField, BoundGroup, GroupCursor, GroupEntry, MdpMessageFactory, Message, MessageFactory,
    SbeParser,
};

// Order books and packet processing
pub mod book;

pub use book::{
    LoggingBookHandler, OrderBook, OrderBookEntry, OrderBookHandler, PacketProcessor, SecDef,
};
