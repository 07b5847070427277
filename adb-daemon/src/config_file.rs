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

//! The daemon configuration file.

use std::{fs, path::Path, time::Duration};

use adb::{AdbConfig, DbId, ProcessConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::options::Options;

/// Contents of the TOML configuration file. Command line options take precedence.
#[must_use]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfigFile {
    pub server_db_id: Option<String>,
    pub system_service_key: Option<String>,
    pub cache: Option<CacheConfigFile>,
    pub storage: Option<StorageConfigFile>,
}

/// Loaded database housekeeping
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfigFile {
    pub keep_in_memory_ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfigFile {
    pub read_timeout_ms: Option<u64>,
    pub watch_debounce_ms: Option<u64>,
    pub blob_chunk_size: Option<usize>,
    pub blob_setup_retry_secs: Option<u64>,
    pub blob_setup_retry_max_secs: Option<u64>,
}

impl DaemonConfigFile {
    fn read_to_string_with_policy(config_path: &Path) -> Result<String> {
        let config_as_str = if config_path.exists() {
            fs::read_to_string(config_path).context(format!(
                "Unable to read config file in {}",
                config_path.display()
            ))?
        } else {
            "".into()
        };
        Ok(config_as_str)
    }

    pub fn parse(config_as_str: &str) -> Result<Self> {
        toml::from_str(config_as_str).context("Failed to parse config")
    }

    /// Reads a configuration from the specified path and overrides it with the options.
    pub fn read(config_path: &Path, options: &Options) -> Result<Self> {
        let config_as_str = Self::read_to_string_with_policy(config_path)?;
        Ok(Self::parse(&config_as_str)?.with_options(options))
    }

    pub fn with_options(self, options: &Options) -> Self {
        let DaemonConfigFile {
            server_db_id,
            system_service_key,
            cache,
            storage,
        } = self;
        let CacheConfigFile {
            keep_in_memory_ttl_secs,
            sweep_interval_secs,
        } = cache.unwrap_or_default();

        let cache = CacheConfigFile {
            keep_in_memory_ttl_secs: options.ttl_secs.or(keep_in_memory_ttl_secs),
            sweep_interval_secs: options.sweep_interval_secs.or(sweep_interval_secs),
        };
        Self {
            server_db_id: options.server_db_id.clone().or(server_db_id),
            system_service_key: options.system_service_key.clone().or(system_service_key),
            cache: Some(cache),
            storage,
        }
    }

    /// Settings for the core, defaults where nothing is configured
    pub fn into_configs(self) -> Result<(AdbConfig, ProcessConfig)> {
        let server_db_id = self
            .server_db_id
            .map(|id| id.parse::<DbId>())
            .transpose()
            .context("Invalid server_db_id")?;
        let cache = self.cache.unwrap_or_default();
        let storage = self.storage.unwrap_or_default();

        let secs = Duration::from_secs;
        let millis = Duration::from_millis;
        let config = AdbConfig {
            keep_in_memory_ttl: cache.keep_in_memory_ttl_secs.map(secs).into(),
            sweep_interval: cache.sweep_interval_secs.map(secs).into(),
            read_timeout: storage.read_timeout_ms.map(millis).into(),
            watch_debounce: storage.watch_debounce_ms.map(millis).into(),
            blob_chunk_size: storage.blob_chunk_size.into(),
            blob_setup_retry_interval: storage.blob_setup_retry_secs.map(secs).into(),
            blob_setup_retry_max_interval: storage.blob_setup_retry_max_secs.map(secs).into(),
            system_service_key: self.system_service_key.into(),
        };
        Ok((config, ProcessConfig { server_db_id }))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::*;

    const FULL: &str = r#"
server_db_id = "abababababababababababababababababababababababababababababababab"
system_service_key = "console"

[cache]
keep_in_memory_ttl_secs = 30
sweep_interval_secs = 3

[storage]
read_timeout_ms = 2500
blob_chunk_size = 1024
"#;

    #[test]
    fn full_file() {
        let (config, process) = DaemonConfigFile::parse(FULL).unwrap().into_configs().unwrap();
        assert_eq!(*config.keep_in_memory_ttl, Duration::from_secs(30));
        assert_eq!(*config.sweep_interval, Duration::from_secs(3));
        assert_eq!(*config.read_timeout, Duration::from_millis(2500));
        assert_eq!(*config.blob_chunk_size, 1024);
        assert_eq!(*config.watch_debounce, *AdbConfig::default().watch_debounce);
        assert_eq!(*config.system_service_key, "console");
        assert_eq!(process.server_db_id.unwrap().to_string(), "ab".repeat(32));
    }

    #[test]
    fn empty_file_means_defaults() {
        let (config, process) = DaemonConfigFile::parse("").unwrap().into_configs().unwrap();
        let defaults = AdbConfig::default();
        assert_eq!(*config.keep_in_memory_ttl, *defaults.keep_in_memory_ttl);
        assert_eq!(*config.system_service_key, *defaults.system_service_key);
        assert_eq!(process.server_db_id, None);
    }

    #[rstest]
    #[case("unknown_key = 1")]
    #[case("[cache]\nttl = 1")]
    #[case("[storage]\nread_timeout_ms = \"fast\"")]
    fn rejected(#[case] contents: &str) {
        assert!(DaemonConfigFile::parse(contents).is_err());
    }

    #[test]
    fn bad_server_db_id() {
        let file = DaemonConfigFile::parse("server_db_id = \"nope\"").unwrap();
        assert!(file.into_configs().is_err());
    }

    #[test]
    fn options_take_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let options = Options {
            ttl_secs: Some(99),
            system_service_key: Some("cli".to_owned()),
            ..Options::default()
        };

        let read = DaemonConfigFile::read(file.path(), &options).unwrap();
        let cache = read.cache.clone().unwrap();
        assert_eq!(cache.keep_in_memory_ttl_secs, Some(99));
        assert_eq!(cache.sweep_interval_secs, Some(3));
        assert_eq!(read.system_service_key.as_deref(), Some("cli"));
        assert!(read.server_db_id.is_some());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let read = DaemonConfigFile::read(&dir.path().join("absent.toml"), &Options::default())
            .unwrap();
        assert_eq!(read.server_db_id, None);
        assert_eq!(read.cache, Some(CacheConfigFile::default()));
    }
}
