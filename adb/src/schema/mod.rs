// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Table identifiers and schemas

mod auto_key;
mod template;
mod validator;

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use auto_key::next_auto_key;
pub use template::Template;
pub use validator::{ValidationError, Validator};

use crate::Error;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid schema definition at {path}: {reason}")]
    InvalidDefinition { path: String, reason: String },
    #[error("Invalid template \"{template}\": {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("Unable to fill template, {pointer} found type {found}")]
    TemplateValue { pointer: String, found: String },
    #[error("Malformed schema: {0}")]
    Malformed(String),
}

/// `"<domain>/<name>"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId {
    domain: String,
    name: String,
}

impl TableId {
    pub fn new(domain: &str, name: &str) -> crate::Result<Self> {
        let valid = |s: &str| !s.is_empty() && !s.contains('/') && !s.contains('\0');
        utils::ensure!(
            valid(domain) && valid(name),
            Error::InvalidTableId(format!("{domain}/{name}"))
        );
        Ok(Self {
            domain: domain.to_owned(),
            name: name.to_owned(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for TableId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, name) =
            s.split_once('/').ok_or_else(|| Error::InvalidTableId(s.to_owned()))?;
        Self::new(domain, name)
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

/// Restrictions on a named blob attached to the records of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlobConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

/// Serialized form of a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchemaDef {
    #[serde(default = "default_revision")]
    pub revision: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_template: Option<String>,
    #[serde(default = "permissive_definition")]
    pub definition: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blobs: BTreeMap<String, BlobConstraints>,
}

fn default_revision() -> u32 {
    1
}

fn permissive_definition() -> Value {
    Value::Bool(true)
}

impl Default for TableSchemaDef {
    fn default() -> Self {
        Self {
            revision: default_revision(),
            key_template: None,
            title_template: None,
            definition: permissive_definition(),
            blobs: BTreeMap::new(),
        }
    }
}

/// A compiled table schema
#[derive(Debug, Clone)]
pub struct TableSchema {
    revision: u32,
    key_template: Option<Template>,
    title_template: Option<Template>,
    validator: Validator,
    blobs: BTreeMap<String, BlobConstraints>,
}

impl TableSchema {
    pub fn new(def: TableSchemaDef) -> Result<Self, SchemaError> {
        Ok(Self {
            revision: def.revision,
            key_template: def.key_template.as_deref().map(Template::parse).transpose()?,
            title_template: def.title_template.as_deref().map(Template::parse).transpose()?,
            validator: Validator::compile(&def.definition)?,
            blobs: def.blobs,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let malformed = |e: serde_json::Error| SchemaError::Malformed(e.to_string());
        let value: Value = serde_json::from_str(json).map_err(malformed)?;
        utils::ensure!(
            value.is_object(),
            SchemaError::Malformed("a table schema must be a JSON object".to_owned())
        );
        Self::new(serde_json::from_value(value).map_err(malformed)?)
    }

    /// Accepts every record, keys are generated
    pub fn permissive() -> Self {
        Self {
            revision: default_revision(),
            key_template: None,
            title_template: None,
            validator: Validator::permissive(),
            blobs: BTreeMap::new(),
        }
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.validator.validate(value)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }

    /// Key for a new record: from the key template, or a fresh time-ordered key if there is none
    pub fn generate_key(&self, value: &Value) -> Result<String, SchemaError> {
        match &self.key_template {
            Some(template) => template.render(value),
            None => Ok(next_auto_key()),
        }
    }

    /// Human-readable title of a record; the key if there is no title template
    pub fn record_title(&self, key: &str, value: &Value) -> String {
        self.title_template
            .as_ref()
            .and_then(|template| template.render(value).ok())
            .unwrap_or_else(|| key.to_owned())
    }

    /// Check a blob about to be attached to a record
    pub fn check_blob(
        &self,
        blob_name: &str,
        mime_type: Option<&str>,
        size: u64,
    ) -> Result<(), ValidationError> {
        // Schemas that declare no blobs do not restrict them
        if self.blobs.is_empty() {
            return Ok(());
        }
        let constraints = self
            .blobs
            .get(blob_name)
            .ok_or_else(|| ValidationError::new("", format!("Invalid blob name: {blob_name}")))?;
        if let Some(allowed) = &constraints.mime_types {
            let mime_type = mime_type.unwrap_or_default();
            if !allowed.iter().any(|m| m == mime_type) {
                return Err(ValidationError::new(
                    "",
                    format!(
                        "Blob mime-type ({mime_type}) is invalid, must be one of {}",
                        allowed.join(", ")
                    ),
                ));
            }
        }
        if let Some(max_size) = constraints.max_size {
            if size > max_size {
                return Err(ValidationError::new(
                    "",
                    format!("Blob size ({size}) is larger than allowed ({max_size})"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn table_id_parsing() {
        let id: TableId = "example.com/posts".parse().unwrap();
        assert_eq!(id.domain(), "example.com");
        assert_eq!(id.name(), "posts");
        assert_eq!(id.to_string(), "example.com/posts");

        for bad in ["posts", "/posts", "example.com/", "a/b/c", ""] {
            assert_eq!(
                bad.parse::<TableId>(),
                Err(Error::InvalidTableId(bad.to_owned())),
                "{bad}"
            );
        }
    }

    #[test]
    fn schema_from_json() {
        let schema = TableSchema::from_json(
            r#"{
                "revision": 2,
                "keyTemplate": "{{/id}}",
                "titleTemplate": "Post {{/id}}",
                "definition": {"type": "object", "required": ["id"]},
                "blobs": {"thumb": {"mimeTypes": ["image/png"], "maxSize": 10}}
            }"#,
        )
        .unwrap();
        assert_eq!(schema.revision(), 2);
        let value = json!({"id": "p1"});
        assert_eq!(schema.generate_key(&value).unwrap(), "p1");
        assert_eq!(schema.record_title("p1", &value), "Post p1");
        assert!(schema.is_valid(&value));
        assert!(!schema.is_valid(&json!({})));

        assert_eq!(schema.check_blob("thumb", Some("image/png"), 10), Ok(()));
        assert!(schema.check_blob("thumb", Some("image/jpeg"), 1).is_err());
        assert!(schema.check_blob("thumb", Some("image/png"), 11).is_err());
        assert!(schema.check_blob("other", Some("image/png"), 1).is_err());
    }

    #[test]
    fn defaults() {
        let schema = TableSchema::from_json("{}").unwrap();
        assert_eq!(schema.revision(), 1);
        assert!(schema.is_valid(&json!({"anything": [1, 2, 3]})));
        let key = schema.generate_key(&json!({})).unwrap();
        assert_eq!(schema.record_title(&key, &json!({})), key);
        assert_eq!(schema.check_blob("any", None, 1 << 30), Ok(()));
        assert!(matches!(TableSchema::from_json("[]"), Err(SchemaError::Malformed(_))));
    }

    #[rstest]
    #[case("[]")]
    #[case("[1, 2]")]
    #[case("null")]
    #[case("\"schema\"")]
    #[case("{\"revision\": \"two\"}")]
    fn non_object_schemas_are_malformed(#[case] json: &str) {
        assert!(matches!(TableSchema::from_json(json), Err(SchemaError::Malformed(_))));
    }
}
