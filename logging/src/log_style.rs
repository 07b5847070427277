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

use thiserror::Error;

/// Terminal coloring of the log output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogStyle {
    Auto,
    Colored,
    Uncolored,
}

impl LogStyle {
    pub fn parse(str: &str) -> Result<LogStyle, LogStyleParseError> {
        let str = str.to_lowercase();
        match str.as_str() {
            "auto" | "text" => Ok(LogStyle::Auto),
            "always" | "text-colored" => Ok(LogStyle::Colored),
            "never" | "text-uncolored" => Ok(LogStyle::Uncolored),
            _ => Err(LogStyleParseError::UnrecognizedFormat(str)),
        }
    }

    /// The value understood by `env_logger`'s write-style setting.
    pub fn as_env_logger_style(&self) -> &'static str {
        match self {
            LogStyle::Auto => "auto",
            LogStyle::Colored => "always",
            LogStyle::Uncolored => "never",
        }
    }
}

pub fn get_log_style_from_env(env_var_name: &str) -> Result<Option<LogStyle>, LogStyleParseError> {
    match std::env::var(env_var_name) {
        Ok(val) => LogStyle::parse(&val).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(LogStyleParseError::NotUnicode),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogStyleParseError {
    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),
    #[error("Env var contains invalid unicode")]
    NotUnicode,
}
