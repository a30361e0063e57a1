// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message layout resolution.
//!
//! Turns raw `<message>` trees plus the `<types>` definitions into
//! [`MessageDescriptor`]s with concrete byte offsets: envelope and header
//! fields, body fields (explicit `offset` attributes or sequential
//! packing), repeating-group dimensions, and nested groups. The resulting
//! [`Schema`] is immutable and shared read-only by all decoders.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{CodecError, Result};
use crate::schema::loader::{self, LoadedSchema, RawElement};
use crate::schema::types::{
    to_snake_case, ByteOrder, ConstValue, EncodedType, EnumValue, Presence, SbePrimitive,
    SetChoice, TypeDef,
};

/// Size in bytes of the per-message size envelope used by MDP transports.
pub const MESSAGE_SIZE_ENVELOPE: usize = 2;

/// Schema-wide decoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Whether each message is preceded by a 2-byte `message_size`
    /// envelope (CME MDP 3.0 framing)
    pub include_message_size_header: bool,
    /// Use the message `description` attribute as the message name
    pub use_description_as_name: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            include_message_size_header: true,
            use_description_as_name: false,
        }
    }
}

/// How a bound field interprets its bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldKind {
    /// Scalar or fixed char array
    Scalar {
        primitive: SbePrimitive,
        /// Element count; > 1 only for char arrays
        count: usize,
        /// Char array decoded as a NUL-terminated string
        is_string: bool,
        null_value: Option<i128>,
        constant: Option<ConstValue>,
        optional: bool,
    },
    /// Enumeration over an integer or char encoding
    Enum {
        primitive: SbePrimitive,
        values: Vec<EnumValue>,
    },
    /// Bit set over an unsigned encoding
    Set {
        primitive: SbePrimitive,
        choices: Vec<SetChoice>,
    },
    /// Composite of scalar parts; `decimal` composites decode as
    /// mantissa x 10^exponent
    Composite {
        parts: Vec<FieldDescriptor>,
        decimal: bool,
    },
}

/// A fully resolved field: name, wire offset, length, and decode rules.
///
/// Offsets are relative to the message start for message-level fields
/// (header included) and relative to the entry start for group fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub original_name: String,
    pub id: Option<u32>,
    pub description: Option<String>,
    pub semantic_type: Option<String>,
    pub since_version: u64,
    pub offset: usize,
    /// Bytes occupied in the layout; constants occupy zero
    pub length: usize,
    pub kind: FieldKind,
}

/// Resolved dimension composite of a repeating group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionDescriptor {
    pub block_length: FieldDescriptor,
    pub num_in_group: FieldDescriptor,
    /// Total encoded size of the dimension composite
    pub size: usize,
}

/// A repeating group: dimension, entry fields, and nested groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub name: String,
    pub original_name: String,
    pub id: Option<u32>,
    pub since_version: u64,
    pub dimension: DimensionDescriptor,
    pub fields: Vec<FieldDescriptor>,
    pub groups: Vec<GroupDescriptor>,
    field_index: HashMap<String, usize>,
}

impl GroupDescriptor {
    /// Look up an entry field by snake_case name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a nested group by snake_case name.
    pub fn group(&self, name: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// A fully resolved message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub template_id: u16,
    /// Message name (`name` attribute, or `description` when configured)
    pub name: String,
    pub original_name: String,
    pub description: Option<String>,
    /// Fixed body size declared by (or computed from) the schema
    pub schema_block_length: usize,
    /// Envelope plus `messageHeader` composite, in bytes
    pub header_size: usize,
    /// Envelope, header, and body fields in wire order
    pub fields: Vec<FieldDescriptor>,
    pub groups: Vec<GroupDescriptor>,
    field_index: HashMap<String, usize>,
}

impl MessageDescriptor {
    /// Look up a field (header or body) by snake_case name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a top-level group by snake_case name.
    pub fn group(&self, name: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// An immutable, fully resolved schema keyed by template id.
#[derive(Debug, Clone)]
pub struct Schema {
    pub config: SchemaConfig,
    /// Schema version from the template file
    pub version: u64,
    pub package: Option<String>,
    messages: Vec<MessageDescriptor>,
    by_template: HashMap<u16, usize>,
}

impl Schema {
    /// Parse an XML template file with MDP defaults.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse_with_config(path, SchemaConfig::default())
    }

    /// Parse an XML template file with explicit options.
    pub fn parse_with_config(path: impl AsRef<Path>, config: SchemaConfig) -> Result<Self> {
        let loaded = loader::load_file(path)?;
        Self::build(loaded, config)
    }

    /// Parse an XML template document from a string.
    pub fn parse_str(xml: &str, config: SchemaConfig) -> Result<Self> {
        let loaded = loader::load_str(xml)?;
        Self::build(loaded, config)
    }

    /// Assemble a schema from preparsed message descriptors (the
    /// serialized-artifact path).
    pub fn from_messages(
        version: u64,
        package: Option<String>,
        config: SchemaConfig,
        messages: Vec<MessageDescriptor>,
    ) -> Result<Self> {
        let mut by_template = HashMap::new();
        for (i, message) in messages.iter().enumerate() {
            if by_template.insert(message.template_id, i).is_some() {
                return Err(CodecError::schema(
                    format!("message '{}'", message.original_name),
                    format!("duplicate template id {}", message.template_id),
                ));
            }
        }
        Ok(Schema {
            config,
            version,
            package,
            messages,
            by_template,
        })
    }

    fn build(loaded: LoadedSchema, config: SchemaConfig) -> Result<Self> {
        let LoadedSchema {
            info,
            types,
            messages: raw_messages,
        } = loaded;

        if info.byte_order == ByteOrder::BigEndian {
            return Err(CodecError::unsupported("big-endian schemas"));
        }

        let header = match types.get("messageHeader") {
            Some(TypeDef::Composite(c)) => c.clone(),
            Some(_) => {
                return Err(CodecError::schema(
                    "messageHeader",
                    "must be a composite type",
                ))
            }
            None => {
                return Err(CodecError::schema(
                    "<types>",
                    "missing required composite 'messageHeader'",
                ))
            }
        };

        let mut messages = Vec::with_capacity(raw_messages.len());
        for raw in &raw_messages {
            messages.push(build_message(&types, &header.parts, raw, &config)?);
        }

        Self::from_messages(info.version, info.package, config, messages)
    }

    /// Look up a message descriptor by template id.
    pub fn message(&self, template_id: u16) -> Option<&MessageDescriptor> {
        self.by_template
            .get(&template_id)
            .map(|&i| &self.messages[i])
    }

    /// All message descriptors in schema order.
    pub fn messages(&self) -> &[MessageDescriptor] {
        &self.messages
    }
}

/// Resolve an enum/set encoding to its primitive. The encoding may name
/// another `<type>` or a primitive directly (any capitalization).
fn resolve_encoding_primitive(
    types: &HashMap<String, TypeDef>,
    encoding: &str,
    context: &str,
) -> Result<SbePrimitive> {
    match types.get(encoding) {
        Some(TypeDef::Encoded(t)) => Ok(t.primitive),
        Some(_) => Err(CodecError::schema(
            context.to_string(),
            format!("encoding type '{encoding}' is not a simple type"),
        )),
        None => SbePrimitive::from_name(encoding)
            .or_else(|| SbePrimitive::from_name(&encoding.to_ascii_lowercase()))
            .ok_or_else(|| {
                CodecError::schema(
                    context.to_string(),
                    format!("unknown encoding type '{encoding}'"),
                )
            }),
    }
}

/// Build a scalar descriptor from an encoded type at a fixed offset.
fn scalar_descriptor(
    encoded: &EncodedType,
    name: String,
    original_name: String,
    id: Option<u32>,
    description: Option<String>,
    semantic_type: Option<String>,
    since_version: u64,
    offset: usize,
) -> Result<FieldDescriptor> {
    let count = encoded.length.unwrap_or(1);
    let constant = encoded.constant()?;
    let length = if constant.is_some() {
        0
    } else {
        encoded.primitive.size() * count
    };
    Ok(FieldDescriptor {
        name,
        original_name,
        id,
        description,
        since_version,
        offset,
        length,
        kind: FieldKind::Scalar {
            primitive: encoded.primitive,
            count,
            is_string: encoded.primitive == SbePrimitive::Char && count > 1,
            null_value: encoded.null_value,
            optional: encoded.presence == Presence::Optional,
            constant,
        },
        semantic_type,
    })
}

/// Build one `<field>` descriptor and advance the running offset.
fn build_field(
    types: &HashMap<String, TypeDef>,
    raw: &RawElement,
    running: &mut usize,
    header_size: usize,
    add_header_size: bool,
) -> Result<FieldDescriptor> {
    let original_name = raw.require_attr("name")?.to_string();
    let name = to_snake_case(&original_name);
    let id: Option<u32> = raw.parse_attr("id")?;
    let description = raw.attr("description").map(|s| s.to_string());
    let since_version: u64 = raw.parse_attr("since_version")?.unwrap_or(0);
    let type_name = raw.require_attr("type")?;
    let context = format!("field '{original_name}'");

    let mut offset = match raw.parse_attr::<usize>("offset")? {
        Some(explicit) => {
            if add_header_size {
                explicit + header_size
            } else {
                explicit
            }
        }
        None => *running,
    };

    let type_def = match types.get(type_name) {
        Some(def) => def.clone(),
        // A bare primitive used directly as a field type
        None => match SbePrimitive::from_name(type_name)
            .or_else(|| SbePrimitive::from_name(&type_name.to_ascii_lowercase()))
        {
            Some(primitive) => TypeDef::Encoded(EncodedType {
                name: type_name.to_string(),
                primitive,
                length: None,
                presence: Presence::Required,
                null_value: None,
                constant_text: None,
                offset: None,
                semantic_type: None,
                description: None,
            }),
            None => {
                return Err(CodecError::schema(
                    context,
                    format!("unknown type reference '{type_name}'"),
                ))
            }
        },
    };

    let field = match type_def {
        TypeDef::Encoded(encoded) => {
            let semantic_type = raw
                .attr("semantic_type")
                .map(|s| s.to_string())
                .or_else(|| encoded.semantic_type.clone());
            scalar_descriptor(
                &encoded,
                name,
                original_name,
                id,
                description,
                semantic_type,
                since_version,
                offset,
            )?
        }
        TypeDef::Enum(enum_type) => {
            let primitive = resolve_encoding_primitive(types, &enum_type.encoding_type, &context)?;
            FieldDescriptor {
                name,
                original_name,
                id,
                description,
                semantic_type: raw
                    .attr("semantic_type")
                    .map(|s| s.to_string())
                    .or(enum_type.semantic_type),
                since_version,
                offset,
                length: primitive.size(),
                kind: FieldKind::Enum {
                    primitive,
                    values: enum_type.values,
                },
            }
        }
        TypeDef::Set(set_type) => {
            let primitive = resolve_encoding_primitive(types, &set_type.encoding_type, &context)?;
            FieldDescriptor {
                name,
                original_name,
                id,
                description,
                semantic_type: raw
                    .attr("semantic_type")
                    .map(|s| s.to_string())
                    .or(set_type.semantic_type),
                since_version,
                offset,
                length: primitive.size(),
                kind: FieldKind::Set {
                    primitive,
                    choices: set_type.choices,
                },
            }
        }
        TypeDef::Composite(composite) => {
            let mut parts = Vec::with_capacity(composite.parts.len());
            let mut part_running = offset;
            for part in &composite.parts {
                if let Some(part_offset) = part.offset {
                    part_running = offset + part_offset;
                }
                let part_desc = scalar_descriptor(
                    part,
                    to_snake_case(&part.name),
                    part.name.clone(),
                    None,
                    part.description.clone(),
                    part.semantic_type.clone(),
                    since_version,
                    part_running,
                )?;
                part_running += part_desc.length;
                parts.push(part_desc);
            }
            let decimal = composite.is_decimal();
            let length = composite.byte_length();
            FieldDescriptor {
                name,
                original_name,
                id,
                description,
                semantic_type: raw
                    .attr("semantic_type")
                    .map(|s| s.to_string())
                    .or(composite.semantic_type),
                since_version,
                offset,
                length,
                kind: FieldKind::Composite { parts, decimal },
            }
        }
    };

    offset += field.length;
    *running = offset;
    Ok(field)
}

/// Build a `<group>` descriptor, recursing into nested groups.
fn build_group(types: &HashMap<String, TypeDef>, raw: &RawElement) -> Result<GroupDescriptor> {
    let original_name = raw.require_attr("name")?.to_string();
    let name = to_snake_case(&original_name);
    let id: Option<u32> = raw.parse_attr("id")?;
    let since_version: u64 = raw.parse_attr("since_version")?.unwrap_or(0);
    let context = format!("group '{original_name}'");

    let dimension_name = raw.require_attr("dimension_type")?;
    let dimension_type = match types.get(dimension_name) {
        Some(TypeDef::Composite(c)) => c,
        Some(_) => {
            return Err(CodecError::schema(
                context,
                format!("dimension type '{dimension_name}' is not a composite"),
            ))
        }
        None => {
            return Err(CodecError::schema(
                context,
                format!("unknown dimension type '{dimension_name}'"),
            ))
        }
    };

    let mut block_length = None;
    let mut num_in_group = None;
    let mut dim_running = 0usize;
    for part in &dimension_type.parts {
        if let Some(part_offset) = part.offset {
            dim_running = part_offset;
        }
        let part_desc = scalar_descriptor(
            part,
            to_snake_case(&part.name),
            part.name.clone(),
            None,
            None,
            None,
            0,
            dim_running,
        )?;
        dim_running += part_desc.length;
        match part.name.as_str() {
            "blockLength" => block_length = Some(part_desc),
            "numInGroup" => num_in_group = Some(part_desc),
            _ => {}
        }
    }

    let dimension = DimensionDescriptor {
        block_length: block_length.ok_or_else(|| {
            CodecError::schema(
                context.clone(),
                format!("dimension type '{dimension_name}' has no 'blockLength' child"),
            )
        })?,
        num_in_group: num_in_group.ok_or_else(|| {
            CodecError::schema(
                context.clone(),
                format!("dimension type '{dimension_name}' has no 'numInGroup' child"),
            )
        })?,
        size: dim_running,
    };

    let mut fields = Vec::new();
    let mut groups = Vec::new();
    let mut running = 0usize;
    for child in &raw.children {
        match child.tag.as_str() {
            "field" => fields.push(build_field(types, child, &mut running, 0, false)?),
            "group" => groups.push(build_group(types, child)?),
            _ => {}
        }
    }

    let field_index = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();

    Ok(GroupDescriptor {
        name,
        original_name,
        id,
        since_version,
        dimension,
        fields,
        groups,
        field_index,
    })
}

/// Build a full message descriptor: envelope, header, body, groups.
fn build_message(
    types: &HashMap<String, TypeDef>,
    header_parts: &[EncodedType],
    raw: &RawElement,
    config: &SchemaConfig,
) -> Result<MessageDescriptor> {
    let original_name = raw.require_attr("name")?.to_string();
    let description = raw.attr("description").map(|s| s.to_string());
    let name = if config.use_description_as_name {
        description.clone().unwrap_or_else(|| original_name.clone())
    } else {
        original_name.clone()
    };

    let template_id: u16 = raw.parse_attr("id")?.ok_or_else(|| {
        CodecError::schema(
            format!("message '{original_name}'"),
            "missing required attribute 'id'",
        )
    })?;

    let mut fields = Vec::new();
    let mut running = 0usize;

    if config.include_message_size_header {
        fields.push(FieldDescriptor {
            name: "message_size".to_string(),
            original_name: "MessageSize".to_string(),
            id: None,
            description: Some("Header Message Size".to_string()),
            semantic_type: None,
            since_version: 0,
            offset: running,
            length: MESSAGE_SIZE_ENVELOPE,
            kind: FieldKind::Scalar {
                primitive: SbePrimitive::UInt16,
                count: 1,
                is_string: false,
                null_value: None,
                constant: None,
                optional: false,
            },
        });
        running += MESSAGE_SIZE_ENVELOPE;
    }

    for part in header_parts {
        let field = scalar_descriptor(
            part,
            to_snake_case(&part.name),
            part.name.clone(),
            None,
            Some(format!("Header {}", part.name)),
            None,
            0,
            running,
        )?;
        running += field.length;
        fields.push(field);
    }
    let header_size = running;

    let mut body_length = 0usize;
    let mut groups = Vec::new();
    for child in &raw.children {
        match child.tag.as_str() {
            "field" => {
                let field = build_field(types, child, &mut running, header_size, true)?;
                body_length += field.length;
                fields.push(field);
            }
            "group" => groups.push(build_group(types, child)?),
            _ => {}
        }
    }

    let schema_block_length = match raw.parse_attr::<usize>("block_length")? {
        Some(explicit) => explicit,
        None => body_length,
    };

    let field_index = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();

    Ok(MessageDescriptor {
        template_id,
        name,
        original_name,
        description,
        schema_block_length,
        header_size,
        fields,
        groups,
        field_index,
    })
}
