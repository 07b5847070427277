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

//! The daemon command line options.

use std::{ffi::OsString, path::PathBuf};

use clap::Parser;

/// ADB database daemon
#[derive(Parser, Debug, Default)]
#[clap(author, version, about)]
pub struct Options {
    /// Path to the TOML configuration file. A missing file means the defaults.
    #[clap(short, long = "config", env = "ADB_CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Registry database to attach to. A new one is created if not given.
    #[clap(long, value_name = "ID", env = "ADB_SERVER_DB_ID")]
    pub server_db_id: Option<String>,

    /// How long a database stays loaded after its last access, in seconds.
    #[clap(long, value_name = "SECS")]
    pub ttl_secs: Option<u64>,

    /// How often idle databases are looked for, in seconds.
    #[clap(long, value_name = "SECS")]
    pub sweep_interval_secs: Option<u64>,

    /// Service key the server itself acts under.
    #[clap(long, value_name = "KEY")]
    pub system_service_key: Option<String>,
}

impl Options {
    /// Parse the command line, exiting with usage on error
    pub fn from_args<A: Into<OsString> + Clone>(args: impl IntoIterator<Item = A>) -> Self {
        Parser::parse_from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all() {
        let opts = Options::try_parse_from([
            "adb-daemon",
            "--config",
            "/etc/adb.toml",
            "--server-db-id",
            "ab",
            "--ttl-secs",
            "30",
            "--sweep-interval-secs",
            "5",
            "--system-service-key",
            "console",
        ])
        .unwrap();
        assert_eq!(opts.config_path, Some(PathBuf::from("/etc/adb.toml")));
        assert_eq!(opts.server_db_id.as_deref(), Some("ab"));
        assert_eq!(opts.ttl_secs, Some(30));
        assert_eq!(opts.sweep_interval_secs, Some(5));
        assert_eq!(opts.system_service_key.as_deref(), Some("console"));
    }

    #[test]
    fn bad_number() {
        assert!(Options::try_parse_from(["adb-daemon", "--ttl-secs", "soon"]).is_err());
    }
}
