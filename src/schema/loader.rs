// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! XML schema loading.
//!
//! Reads an SBE template file into raw element trees, then builds the
//! typed `<types>` definitions. Message layout resolution happens in
//! [`crate::schema::message`]; this module only deals with the XML shape:
//! namespace-prefixed tags, camelCase attributes, comments, and the
//! `<types>` / `<message>` split.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::{CodecError, Result};
use crate::schema::types::{
    to_snake_case, ByteOrder, CompositeType, EncodedType, EnumType, EnumValue, Presence,
    SbePrimitive, SetChoice, SetType, TypeDef,
};

/// Attributes of the top-level schema element.
#[derive(Debug, Clone, Default)]
pub struct SchemaInfo {
    pub package: Option<String>,
    pub id: Option<u32>,
    /// Highest schema version this template describes
    pub version: u64,
    pub byte_order: ByteOrder,
}

/// A raw XML element: local tag name, snake_cased attributes, trimmed
/// text content, and child elements in document order. Comments are
/// dropped during the read.
#[derive(Debug, Clone)]
pub(crate) struct RawElement {
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    pub fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            CodecError::schema(
                format!("<{}>", self.tag),
                format!("missing required attribute '{name}'"),
            )
        })
    }

    /// Parse an optional numeric attribute.
    pub fn parse_attr<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.attr(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                CodecError::schema(
                    format!("<{}>", self.tag),
                    format!("invalid numeric attribute {name}='{raw}'"),
                )
            }),
        }
    }
}

/// Everything pulled out of a schema file, before layout resolution.
#[derive(Debug)]
pub(crate) struct LoadedSchema {
    pub info: SchemaInfo,
    pub types: HashMap<String, TypeDef>,
    pub messages: Vec<RawElement>,
}

/// Load and pre-parse a schema file.
pub(crate) fn load_file(path: impl AsRef<Path>) -> Result<LoadedSchema> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|e| {
        CodecError::io(format!("schema file '{}'", path.display()), e.to_string())
    })?;
    load_str(&xml)
}

/// Load and pre-parse a schema document from a string.
pub(crate) fn load_str(xml: &str) -> Result<LoadedSchema> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut info: Option<SchemaInfo> = None;
    let mut types: HashMap<String, TypeDef> = HashMap::new();
    let mut messages: Vec<RawElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e)?.as_str() {
                "messageSchema" => {
                    info = Some(parse_schema_info(e)?);
                }
                "types" => {
                    let elem = read_element(&mut reader, e, false)?;
                    for child in &elem.children {
                        let type_def = build_type_def(child)?;
                        types.insert(type_def.name().to_string(), type_def);
                    }
                }
                "message" => {
                    messages.push(read_element(&mut reader, e, false)?);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if local_name(e)?.as_str() == "messageSchema" {
                    info = Some(parse_schema_info(e)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CodecError::schema("xml", e.to_string()));
            }
            _ => {}
        }
        buf.clear();
    }

    let info = info
        .ok_or_else(|| CodecError::schema("xml", "no <messageSchema> element found"))?;

    if info.byte_order == ByteOrder::BigEndian {
        return Err(CodecError::unsupported(
            "big-endian schemas (byteOrder=\"bigEndian\")",
        ));
    }

    Ok(LoadedSchema {
        info,
        types,
        messages,
    })
}

/// Local (namespace-stripped) tag name of an element.
fn local_name(e: &BytesStart<'_>) -> Result<String> {
    let name = e.name();
    let local = name.local_name();
    std::str::from_utf8(local.as_ref())
        .map(|s| s.to_string())
        .map_err(|e| CodecError::schema("xml", format!("invalid tag name: {e}")))
}

/// Parse attributes of the `<messageSchema>` element.
fn parse_schema_info(e: &BytesStart<'_>) -> Result<SchemaInfo> {
    let mut info = SchemaInfo::default();
    for (key, value) in element_attrs(e)? {
        match key.as_str() {
            "package" => info.package = Some(value),
            "id" => {
                info.id = Some(value.trim().parse().map_err(|_| {
                    CodecError::schema("<messageSchema>", format!("invalid id '{value}'"))
                })?)
            }
            "version" => {
                info.version = value.trim().parse().map_err(|_| {
                    CodecError::schema("<messageSchema>", format!("invalid version '{value}'"))
                })?
            }
            "byte_order" => {
                info.byte_order = ByteOrder::from_attr(&value).ok_or_else(|| {
                    CodecError::schema("<messageSchema>", format!("invalid byteOrder '{value}'"))
                })?
            }
            _ => {}
        }
    }
    Ok(info)
}

/// Collect an element's attributes with snake_cased local-name keys.
fn element_attrs(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| CodecError::schema("xml", e.to_string()))?;
        let key_local = attr.key.local_name();
        let key = std::str::from_utf8(key_local.as_ref())
            .map_err(|e| CodecError::schema("xml", format!("invalid attribute name: {e}")))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| CodecError::schema("xml", format!("invalid attribute value: {e}")))?
            .to_string();
        out.push((to_snake_case(key), value));
    }
    Ok(out)
}

/// Recursively read an element subtree into a [`RawElement`].
fn read_element(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<RawElement> {
    let tag = local_name(start)?;
    let attrs: HashMap<String, String> = element_attrs(start)?.into_iter().collect();

    let mut elem = RawElement {
        tag,
        attrs,
        text: None,
        children: Vec::new(),
    };

    if empty {
        return Ok(elem);
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                elem.children.push(read_element(reader, e, false)?);
            }
            Ok(Event::Empty(ref e)) => {
                elem.children.push(read_element(reader, e, true)?);
            }
            Ok(Event::Text(ref t)) => {
                let text = std::str::from_utf8(t.as_ref())
                    .map_err(|e| CodecError::schema("xml", format!("invalid text: {e}")))?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    elem.text = Some(trimmed.to_string());
                }
            }
            Ok(Event::CData(ref t)) => {
                let text = String::from_utf8_lossy(t.as_ref());
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    elem.text = Some(trimmed.to_string());
                }
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(CodecError::schema(
                    format!("<{}>", elem.tag),
                    "unexpected end of document inside element",
                ));
            }
            Err(e) => return Err(CodecError::schema("xml", e.to_string())),
            // Comments and processing instructions are skipped
            _ => {}
        }
        buf.clear();
    }

    Ok(elem)
}

/// Build a typed definition from a raw `<type|enum|set|composite>` element.
pub(crate) fn build_type_def(elem: &RawElement) -> Result<TypeDef> {
    match elem.tag.as_str() {
        "type" => Ok(TypeDef::Encoded(build_encoded_type(elem)?)),
        "enum" => {
            let name = elem.require_attr("name")?.to_string();
            let encoding_type = elem.require_attr("encoding_type")?.to_string();
            let mut values = Vec::new();
            for child in &elem.children {
                let value_name = child.require_attr("name")?.to_string();
                let text = child.text.clone().ok_or_else(|| {
                    CodecError::schema(
                        format!("enum '{name}'"),
                        format!("value '{value_name}' has no encoded text"),
                    )
                })?;
                values.push(EnumValue {
                    text,
                    name: value_name,
                    description: child.attr("description").map(|s| s.to_string()),
                });
            }
            Ok(TypeDef::Enum(EnumType {
                name,
                encoding_type,
                values,
                semantic_type: elem.attr("semantic_type").map(|s| s.to_string()),
                description: elem.attr("description").map(|s| s.to_string()),
            }))
        }
        "set" => {
            let name = elem.require_attr("name")?.to_string();
            let encoding_type = elem.require_attr("encoding_type")?.to_string();
            let mut choices = Vec::new();
            for child in &elem.children {
                let choice_name = child.require_attr("name")?.to_string();
                let text = child.text.as_deref().ok_or_else(|| {
                    CodecError::schema(
                        format!("set '{name}'"),
                        format!("choice '{choice_name}' has no bit position"),
                    )
                })?;
                let bit = text.trim().parse::<u32>().map_err(|_| {
                    CodecError::schema(
                        format!("set '{name}'"),
                        format!("invalid bit position '{text}' for choice '{choice_name}'"),
                    )
                })?;
                choices.push(SetChoice {
                    bit,
                    name: choice_name,
                });
            }
            Ok(TypeDef::Set(SetType {
                name,
                encoding_type,
                choices,
                semantic_type: elem.attr("semantic_type").map(|s| s.to_string()),
                description: elem.attr("description").map(|s| s.to_string()),
            }))
        }
        "composite" => {
            let name = elem.require_attr("name")?.to_string();
            let mut parts = Vec::new();
            for child in &elem.children {
                if child.tag != "type" {
                    return Err(CodecError::schema(
                        format!("composite '{name}'"),
                        format!("unsupported child element <{}>", child.tag),
                    ));
                }
                parts.push(build_encoded_type(child)?);
            }
            Ok(TypeDef::Composite(CompositeType {
                name,
                parts,
                semantic_type: elem.attr("semantic_type").map(|s| s.to_string()),
                description: elem.attr("description").map(|s| s.to_string()),
            }))
        }
        other => Err(CodecError::schema(
            "<types>",
            format!("unsupported type element <{other}>"),
        )),
    }
}

fn build_encoded_type(elem: &RawElement) -> Result<EncodedType> {
    let name = elem.require_attr("name")?.to_string();
    let primitive_name = elem.require_attr("primitive_type")?;
    let primitive = SbePrimitive::from_name(primitive_name).ok_or_else(|| {
        CodecError::schema(
            format!("type '{name}'"),
            format!("unknown primitive type '{primitive_name}'"),
        )
    })?;

    let presence = match elem.attr("presence") {
        None => Presence::Required,
        Some(raw) => Presence::from_attr(raw).ok_or_else(|| {
            CodecError::schema(
                format!("type '{name}'"),
                format!("invalid presence '{raw}'"),
            )
        })?,
    };

    Ok(EncodedType {
        length: elem.parse_attr("length")?,
        null_value: elem.parse_attr("null_value")?,
        offset: elem.parse_attr("offset")?,
        constant_text: elem.text.clone(),
        semantic_type: elem.attr("semantic_type").map(|s| s.to_string()),
        description: elem.attr("description").map(|s| s.to_string()),
        name,
        primitive,
        presence,
    })
}
