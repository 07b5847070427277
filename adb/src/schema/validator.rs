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

//! Validation of JSON values against a declarative schema.
//!
//! Supported keywords: `type` (one or a list), `properties`, `required`,
//! `additionalProperties` (boolean or schema), `items`, `enum`, `format` (`date-time`, `date`,
//! `uri`, `email`), `pattern`, `minLength`, `maxLength`, `minimum` and `maximum`. Other keywords
//! (`$schema`, `title`, `description`, ...) are ignored.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};

use super::SchemaError;

/// The first constraint a value failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON pointer to the offending part of the value, empty for the value itself
    pub instance_path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "value {}", self.message)
        } else {
            write!(f, "{} {}", self.instance_path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl JsonType {
    fn parse(s: &str) -> Option<Self> {
        let tp = match s {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "string" => Self::String,
            _ => return None,
        };
        Some(tp)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, Value::Object(_))
            | (Self::Array, Value::Array(_))
            | (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    DateTime,
    Date,
    Uri,
    Email,
}

impl Format {
    fn parse(s: &str) -> Option<Self> {
        let format = match s {
            "date-time" => Self::DateTime,
            "date" => Self::Date,
            "uri" => Self::Uri,
            "email" => Self::Email,
            _ => return None,
        };
        Some(format)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uri => "uri",
            Self::Email => "email",
        }
    }

    fn check(&self, s: &str) -> bool {
        match self {
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            Self::Date => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            Self::Uri => is_uri(s),
            Self::Email => is_email(s),
        }
    }
}

fn is_uri(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    let mut scheme_chars = scheme.chars();
    scheme_chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
        && !s.chars().any(char::is_whitespace)
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
        && !s.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone)]
enum Additional {
    Allow,
    Deny,
    Schema(Box<Node>),
}

#[derive(Debug, Clone)]
struct Node {
    // `false` schema
    reject_all: bool,
    types: Option<Vec<JsonType>>,
    properties: BTreeMap<String, Node>,
    required: Vec<String>,
    additional: Additional,
    items: Option<Box<Node>>,
    enum_values: Option<Vec<Value>>,
    format: Option<Format>,
    pattern: Option<Regex>,
    min_length: Option<u64>,
    max_length: Option<u64>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl Node {
    fn accept_all() -> Self {
        Self {
            reject_all: false,
            types: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional: Additional::Allow,
            items: None,
            enum_values: None,
            format: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
        }
    }

    fn compile(schema: &Value, path: &str) -> Result<Self, SchemaError> {
        let obj = match schema {
            Value::Bool(accept) => {
                return Ok(Self {
                    reject_all: !accept,
                    ..Self::accept_all()
                })
            }
            Value::Object(obj) => obj,
            _ => return Err(invalid(path, "schema must be an object or a boolean")),
        };
        let mut node = Self::accept_all();

        if let Some(tp) = obj.get("type") {
            node.types = Some(compile_types(tp, path)?);
        }
        if let Some(props) = obj.get("properties") {
            let props = props
                .as_object()
                .ok_or_else(|| invalid(path, "properties must be an object"))?;
            for (name, sub) in props {
                let sub_path = format!("{path}/properties/{name}");
                node.properties.insert(name.clone(), Self::compile(sub, &sub_path)?);
            }
        }
        if let Some(required) = obj.get("required") {
            node.required = string_list(required)
                .ok_or_else(|| invalid(path, "required must be a list of strings"))?;
        }
        match obj.get("additionalProperties") {
            None | Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => node.additional = Additional::Deny,
            Some(sub) => {
                let sub_path = format!("{path}/additionalProperties");
                node.additional = Additional::Schema(Box::new(Self::compile(sub, &sub_path)?));
            }
        }
        if let Some(items) = obj.get("items") {
            let sub_path = format!("{path}/items");
            node.items = Some(Box::new(Self::compile(items, &sub_path)?));
        }
        if let Some(values) = obj.get("enum") {
            let values =
                values.as_array().ok_or_else(|| invalid(path, "enum must be a list"))?;
            node.enum_values = Some(values.clone());
        }
        if let Some(format) = obj.get("format") {
            let format = format.as_str().ok_or_else(|| invalid(path, "format must be a string"))?;
            node.format = Some(
                Format::parse(format)
                    .ok_or_else(|| invalid(path, &format!("unknown format \"{format}\"")))?,
            );
        }
        if let Some(pattern) = obj.get("pattern") {
            let pattern =
                pattern.as_str().ok_or_else(|| invalid(path, "pattern must be a string"))?;
            node.pattern = Some(
                Regex::new(pattern)
                    .map_err(|e| invalid(path, &format!("bad pattern \"{pattern}\": {e}")))?,
            );
        }
        node.min_length = non_negative_int(obj, "minLength", path)?;
        node.max_length = non_negative_int(obj, "maxLength", path)?;
        node.minimum = number(obj, "minimum", path)?;
        node.maximum = number(obj, "maximum", path)?;
        Ok(node)
    }

    fn validate(&self, value: &Value, path: &mut String) -> Result<(), ValidationError> {
        if self.reject_all {
            return fail(path, "must not be present".to_owned());
        }
        if let Some(types) = &self.types {
            if !types.iter().any(|tp| tp.matches(value)) {
                let names: Vec<_> = types.iter().map(JsonType::name).collect();
                return fail(path, format!("must be {}", names.join(",")));
            }
        }
        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                return fail(path, "must be equal to one of the allowed values".to_owned());
            }
        }

        match value {
            Value::String(s) => {
                let len = s.chars().count() as u64;
                if let Some(min) = self.min_length {
                    if len < min {
                        return fail(path, format!("must NOT have fewer than {min} characters"));
                    }
                }
                if let Some(max) = self.max_length {
                    if len > max {
                        return fail(path, format!("must NOT have more than {max} characters"));
                    }
                }
                if let Some(format) = &self.format {
                    if !format.check(s) {
                        return fail(path, format!("must match format \"{}\"", format.name()));
                    }
                }
                if let Some(pattern) = &self.pattern {
                    if !pattern.is_match(s) {
                        return fail(path, format!("must match pattern \"{}\"", pattern.as_str()));
                    }
                }
            }
            Value::Number(n) => {
                let n = n.as_f64().unwrap_or(f64::NAN);
                if let Some(min) = self.minimum {
                    if n.is_nan() || n < min {
                        return fail(path, format!("must be >= {min}"));
                    }
                }
                if let Some(max) = self.maximum {
                    if n.is_nan() || n > max {
                        return fail(path, format!("must be <= {max}"));
                    }
                }
            }
            Value::Object(obj) => self.validate_object(obj, path)?,
            Value::Array(items) => {
                if let Some(item_node) = &self.items {
                    for (i, item) in items.iter().enumerate() {
                        with_segment(path, &i.to_string(), |path| item_node.validate(item, path))?;
                    }
                }
            }
            Value::Null | Value::Bool(_) => {}
        }
        Ok(())
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        path: &mut String,
    ) -> Result<(), ValidationError> {
        if let Some(missing) = self.required.iter().find(|name| !obj.contains_key(*name)) {
            return fail(path, format!("must have required property '{missing}'"));
        }
        for (name, value) in obj {
            let node = match (self.properties.get(name), &self.additional) {
                (Some(node), _) => node,
                (None, Additional::Schema(node)) => node.as_ref(),
                (None, Additional::Allow) => continue,
                (None, Additional::Deny) => {
                    return fail(path, format!("must NOT have additional property '{name}'"))
                }
            };
            with_segment(path, name, |path| node.validate(value, path))?;
        }
        Ok(())
    }
}

fn fail(path: &str, message: String) -> Result<(), ValidationError> {
    Err(ValidationError::new(path, message))
}

/// Run `f` with `segment` appended to the JSON pointer `path`, restoring it afterwards
fn with_segment<T>(path: &mut String, segment: &str, f: impl FnOnce(&mut String) -> T) -> T {
    let len = path.len();
    path.push('/');
    path.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    let res = f(path);
    path.truncate(len);
    res
}

fn invalid(path: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidDefinition {
        path: if path.is_empty() { "/".to_owned() } else { path.to_owned() },
        reason: reason.to_owned(),
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array()?.iter().map(|v| v.as_str().map(str::to_owned)).collect()
}

fn compile_types(tp: &Value, path: &str) -> Result<Vec<JsonType>, SchemaError> {
    let names = match tp {
        Value::String(s) => vec![s.clone()],
        other => string_list(other)
            .ok_or_else(|| invalid(path, "type must be a string or a list of strings"))?,
    };
    names
        .iter()
        .map(|name| {
            JsonType::parse(name).ok_or_else(|| invalid(path, &format!("unknown type \"{name}\"")))
        })
        .collect()
}

fn non_negative_int(
    obj: &Map<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Option<u64>, SchemaError> {
    obj.get(keyword)
        .map(|v| {
            v.as_u64()
                .ok_or_else(|| invalid(path, &format!("{keyword} must be a non-negative integer")))
        })
        .transpose()
}

fn number(obj: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<f64>, SchemaError> {
    obj.get(keyword)
        .map(|v| v.as_f64().ok_or_else(|| invalid(path, &format!("{keyword} must be a number"))))
        .transpose()
}

/// A compiled schema definition
#[derive(Debug, Clone)]
pub struct Validator {
    root: Node,
}

impl Validator {
    pub fn compile(definition: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            root: Node::compile(definition, "")?,
        })
    }

    /// Accepts any value
    pub fn permissive() -> Self {
        Self {
            root: Node::accept_all(),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.root.validate(value, &mut String::new())
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn person() -> Validator {
        Validator::compile(&json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Person",
            "type": "object",
            "required": ["id", "createdAt"],
            "additionalProperties": false,
            "properties": {
                "id": {"type": "string", "minLength": 1, "maxLength": 8, "pattern": "^[a-z0-9]+$"},
                "createdAt": {"type": "string", "format": "date-time"},
                "birthday": {"type": "string", "format": "date"},
                "homepage": {"type": "string", "format": "uri"},
                "email": {"type": "string", "format": "email"},
                "age": {"type": "integer", "minimum": 0, "maximum": 150},
                "role": {"enum": ["admin", "user"]},
                "nickname": {"type": ["string", "null"]},
                "tags": {"type": "array", "items": {"type": "string"}},
                "meta": {"type": "object", "additionalProperties": {"type": "number"}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_value() {
        let value = json!({
            "id": "k1",
            "createdAt": "2021-10-01T12:00:00.000Z",
            "birthday": "1990-01-31",
            "homepage": "https://example.com/me",
            "email": "alice@example.com",
            "age": 30,
            "role": "admin",
            "nickname": null,
            "tags": ["a", "b"],
            "meta": {"score": 1.5}
        });
        assert_eq!(person().validate(&value), Ok(()));
    }

    #[rstest]
    #[case(json!({"id": "k1"}), "", "must have required property 'createdAt'")]
    #[case(json!("nope"), "", "must be object")]
    #[case(json!({"id": 5, "createdAt": "2021-10-01T12:00:00Z"}), "/id", "must be string")]
    #[case(json!({"id": "", "createdAt": "2021-10-01T12:00:00Z"}), "/id", "must NOT have fewer than 1 characters")]
    #[case(json!({"id": "abcdefghi", "createdAt": "2021-10-01T12:00:00Z"}), "/id", "must NOT have more than 8 characters")]
    #[case(json!({"id": "A!", "createdAt": "2021-10-01T12:00:00Z"}), "/id", "must match pattern \"^[a-z0-9]+$\"")]
    #[case(json!({"id": "k1", "createdAt": "yesterday"}), "/createdAt", "must match format \"date-time\"")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "birthday": "1990-13-01"}), "/birthday", "must match format \"date\"")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "homepage": "not a uri"}), "/homepage", "must match format \"uri\"")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "email": "alice"}), "/email", "must match format \"email\"")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "age": 1.5}), "/age", "must be integer")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "age": -1}), "/age", "must be >= 0")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "age": 200}), "/age", "must be <= 150")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "role": "root"}), "/role", "must be equal to one of the allowed values")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "tags": ["a", 1]}), "/tags/1", "must be string")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "meta": {"a/b": "x"}}), "/meta/a~1b", "must be number")]
    #[case(json!({"id": "k1", "createdAt": "2021-10-01T12:00:00Z", "extra": 1}), "", "must NOT have additional property 'extra'")]
    fn reports_first_failure(#[case] value: Value, #[case] path: &str, #[case] message: &str) {
        assert_eq!(person().validate(&value), Err(ValidationError::new(path, message)));
    }

    #[rstest]
    #[case(json!(5))]
    #[case(json!({"type": "thing"}))]
    #[case(json!({"type": "string", "format": "color"}))]
    #[case(json!({"type": "string", "pattern": "("}))]
    #[case(json!({"required": "id"}))]
    #[case(json!({"minLength": -1}))]
    fn rejects_bad_definitions(#[case] definition: Value) {
        assert!(matches!(
            Validator::compile(&definition),
            Err(SchemaError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn boolean_schemas() {
        let v = Validator::compile(&json!({"properties": {"gone": false, "any": true}})).unwrap();
        assert!(v.is_valid(&json!({"any": [1, 2]})));
        assert!(!v.is_valid(&json!({"gone": 1})));
        assert!(Validator::permissive().is_valid(&json!(null)));
    }

    #[test]
    fn error_display() {
        assert_eq!(ValidationError::new("/id", "must be string").to_string(), "/id must be string");
        assert_eq!(ValidationError::new("", "must be object").to_string(), "value must be object");
    }
}
