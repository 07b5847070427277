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

//! Schemas of the registry tables

use serde_json::json;

use crate::schema::{SchemaError, TableSchema, TableSchemaDef};

pub const DATABASES_TABLE: &str = "adb/databases";
pub const USERS_TABLE: &str = "adb/users";
pub const SERVICES_TABLE: &str = "adb/services";

const DB_ID_PATTERN: &str = "^[0-9a-fA-F]{64}$";

pub fn databases() -> Result<TableSchema, SchemaError> {
    let principal = json!({
        "type": "object",
        "required": ["userKey", "serviceKey"],
        "properties": {
            "userKey": {"type": "string", "minLength": 1},
            "serviceKey": {"type": "string", "minLength": 1},
        },
    });
    TableSchema::new(TableSchemaDef {
        revision: 1,
        key_template: Some("{{/dbId}}".to_owned()),
        title_template: Some("Database {{/dbId}}".to_owned()),
        definition: json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "required": ["dbId", "createdAt"],
            "properties": {
                "dbId": {"type": "string", "pattern": DB_ID_PATTERN},
                "owningUserKey": {"type": "string", "minLength": 1},
                "owningServiceKey": {"type": "string", "minLength": 1},
                "network": {
                    "type": "object",
                    "properties": {
                        "access": {"type": "string", "enum": ["public", "private"]},
                    },
                },
                "services": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["serviceKey"],
                        "properties": {
                            "serviceKey": {"type": "string", "minLength": 1},
                            "alias": {"type": "string", "minLength": 1},
                            "persist": {"type": "boolean"},
                            "presync": {"type": "boolean"},
                        },
                    },
                },
                "cachedMeta": {
                    "type": "object",
                    "properties": {
                        "displayName": {"type": "string"},
                        "writable": {"type": "boolean"},
                    },
                },
                "createdBy": principal,
                "createdAt": {"type": "string", "format": "date-time"},
            },
        }),
        ..TableSchemaDef::default()
    })
}

pub fn users() -> Result<TableSchema, SchemaError> {
    TableSchema::new(TableSchemaDef {
        revision: 1,
        key_template: Some("{{/userKey}}".to_owned()),
        title_template: Some("{{/userKey}}".to_owned()),
        definition: json!({
            "type": "object",
            "required": ["userKey", "role"],
            "properties": {
                "userKey": {"type": "string", "minLength": 1},
                "role": {"type": "string", "enum": ["admin", "user"]},
            },
        }),
        ..TableSchemaDef::default()
    })
}

pub fn services() -> Result<TableSchema, SchemaError> {
    TableSchema::new(TableSchemaDef {
        revision: 1,
        key_template: Some("{{/serviceKey}}".to_owned()),
        title_template: Some("{{/serviceKey}}".to_owned()),
        definition: json!({
            "type": "object",
            "required": ["serviceKey", "owningUserKey"],
            "properties": {
                "serviceKey": {"type": "string", "minLength": 1},
                "owningUserKey": {"type": "string", "minLength": 1},
            },
        }),
        ..TableSchemaDef::default()
    })
}
