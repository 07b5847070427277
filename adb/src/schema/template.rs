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

//! Text templates with JSON pointer placeholders, e.g. `"{{/author}}: {{/title}}"`

use serde_json::Value;

use super::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Pointer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let bad = |reason: &str| SchemaError::InvalidTemplate {
            template: source.to_owned(),
            reason: reason.to_owned(),
        };
        let mut parts = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find("{{") {
            let text = &rest[..open];
            if text.contains("}}") {
                return Err(bad("unbalanced {{ }} brackets"));
            }
            if !text.is_empty() {
                parts.push(Part::Text(text.to_owned()));
            }
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| bad("unbalanced {{ }} brackets"))?;
            let pointer = &after[..close];
            if pointer.contains("{{") {
                return Err(bad("unbalanced {{ }} brackets"));
            }
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(bad("placeholders must be JSON pointers"));
            }
            parts.push(Part::Pointer(pointer.to_owned()));
            rest = &after[close + 2..];
        }
        if rest.contains("}}") {
            return Err(bad("unbalanced {{ }} brackets"));
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_owned()));
        }
        Ok(Self {
            source: source.to_owned(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Fill the placeholders from `value`. Each pointer must resolve to a string, a number or
    /// a boolean.
    pub fn render(&self, value: &Value) -> Result<String, SchemaError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Pointer(pointer) => match value.pointer(pointer) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(v @ (Value::Number(_) | Value::Bool(_))) => out.push_str(&v.to_string()),
                    found => {
                        return Err(SchemaError::TemplateValue {
                            pointer: pointer.clone(),
                            found: type_name(found).to_owned(),
                        })
                    }
                },
            }
        }
        Ok(out)
    }
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("{{/id}}", "k1")]
    #[case("{{/author/name}}: {{/title}}", "alice: Hello")]
    #[case("n{{/count}}-{{/done}}", "n3-true")]
    #[case("plain", "plain")]
    fn render(#[case] template: &str, #[case] expected: &str) {
        let value = json!({
            "id": "k1",
            "author": {"name": "alice"},
            "title": "Hello",
            "count": 3,
            "done": true
        });
        assert_eq!(Template::parse(template).unwrap().render(&value).unwrap(), expected);
    }

    #[rstest]
    #[case("{{/id")]
    #[case("/id}}")]
    #[case("{{/a}} }} {{/b}}")]
    #[case("{{ {{/a}} }}")]
    #[case("{{id}}")]
    fn rejects_malformed(#[case] template: &str) {
        assert!(matches!(
            Template::parse(template),
            Err(SchemaError::InvalidTemplate { .. })
        ));
    }

    #[rstest]
    #[case(json!({}), "undefined")]
    #[case(json!({"id": null}), "null")]
    #[case(json!({"id": {"x": 1}}), "object")]
    #[case(json!({"id": [1]}), "array")]
    fn pointer_must_resolve_to_scalar(#[case] value: Value, #[case] found: &str) {
        let template = Template::parse("{{/id}}").unwrap();
        assert_eq!(
            template.render(&value),
            Err(SchemaError::TemplateValue {
                pointer: "/id".to_owned(),
                found: found.to_owned()
            })
        );
    }
}
