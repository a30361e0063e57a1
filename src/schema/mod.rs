// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! SBE schema model and loading.
//!
//! This module provides:
//! - The `<types>` model (primitives, enums, sets, composites)
//! - XML template loading
//! - Message layout resolution into offset-bearing descriptors
//! - Serialized schema artifacts

pub mod artifact;
pub mod loader;
pub mod message;
pub mod types;

pub use artifact::SchemaArtifact;
pub use loader::SchemaInfo;
pub use message::{
    DimensionDescriptor, FieldDescriptor, FieldKind, GroupDescriptor, MessageDescriptor, Schema,
    SchemaConfig, MESSAGE_SIZE_ENVELOPE,
};
pub use types::{
    to_snake_case, ByteOrder, CompositeType, ConstValue, EncodedType, EnumType, EnumValue,
    Presence, SbePrimitive, SetChoice, SetType, TypeDef,
};
