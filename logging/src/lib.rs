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

mod log_style;

pub use log;
pub use log_style::{get_log_style_from_env, LogStyle, LogStyleParseError};

/// Env var holding the filter directives, e.g. `adb=debug,storage_inmemory=info`.
pub const LOG_FILTER_ENV_VAR: &str = "RUST_LOG";

/// Env var selecting the output coloring, see [LogStyle].
pub const LOG_STYLE_ENV_VAR: &str = "ADB_LOG_STYLE";

const DEFAULT_FILTER: &str = "info";

static INITIALIZE_LOGGER_ONCE_FLAG: std::sync::Once = std::sync::Once::new();

/// Install the global logger. Only the first call has an effect.
pub fn init_logging() {
    INITIALIZE_LOGGER_ONCE_FLAG.call_once(|| {
        let style = match get_log_style_from_env(LOG_STYLE_ENV_VAR) {
            Ok(style) => style.unwrap_or(LogStyle::Auto),
            Err(err) => {
                eprintln!("Ignoring {LOG_STYLE_ENV_VAR}: {err}");
                LogStyle::Auto
            }
        };

        let env = env_logger::Env::new()
            .filter_or(LOG_FILTER_ENV_VAR, DEFAULT_FILTER)
            .write_style_or(LOG_STYLE_ENV_VAR, style.as_env_logger_style());

        // Tests may install their own logger first (e.g. via `try_init` in a test harness).
        let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
    });
}
