// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Serialized schema artifacts.
//!
//! A resolved [`Schema`] can be written out as JSON and loaded back
//! without the XML template file. This is the explicit replacement for
//! import-a-generated-module schema distribution: point the loader at an
//! artifact path instead of a template path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{CodecError, Result};
use crate::schema::message::{MessageDescriptor, Schema, SchemaConfig};

/// On-disk representation of a resolved schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaArtifact {
    pub version: u64,
    pub package: Option<String>,
    pub config: SchemaConfig,
    pub messages: Vec<MessageDescriptor>,
}

impl SchemaArtifact {
    /// Capture a schema into its artifact form.
    pub fn from_schema(schema: &Schema) -> Self {
        SchemaArtifact {
            version: schema.version,
            package: schema.package.clone(),
            config: schema.config.clone(),
            messages: schema.messages().to_vec(),
        }
    }

    /// Rebuild the schema, re-validating template-id uniqueness.
    pub fn into_schema(self) -> Result<Schema> {
        Schema::from_messages(self.version, self.package, self.config, self.messages)
    }
}

impl Schema {
    /// Serialize this schema to an artifact JSON string.
    pub fn to_artifact_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&SchemaArtifact::from_schema(self))
            .map_err(|e| CodecError::schema("artifact", e.to_string()))
    }

    /// Load a schema from an artifact JSON string.
    pub fn from_artifact_json(json: &str) -> Result<Self> {
        let artifact: SchemaArtifact = serde_json::from_str(json)
            .map_err(|e| CodecError::schema("artifact", e.to_string()))?;
        artifact.into_schema()
    }

    /// Load a schema from an artifact file.
    pub fn load_artifact(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CodecError::io(format!("artifact file '{}'", path.display()), e.to_string())
        })?;
        Self::from_artifact_json(&json)
    }

    /// Write this schema to an artifact file.
    pub fn save_artifact(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_artifact_json()?;
        std::fs::write(path, json).map_err(|e| {
            CodecError::io(format!("artifact file '{}'", path.display()), e.to_string())
        })
    }
}
