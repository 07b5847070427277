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

mod config_file;
mod options;

use std::{path::PathBuf, sync::Arc};

use adb::DbManager;
use anyhow::Context;
use logging::log;
use storage_inmemory::InMemoryBackend;

use crate::{config_file::DaemonConfigFile, options::Options};

const DEFAULT_CONFIG_NAME: &str = "adb.toml";

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install the SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to wait for Ctrl-C")?,
            _ = terminate.recv() => log::info!("SIGTERM received"),
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C")?;
    Ok(())
}

pub async fn run() -> anyhow::Result<()> {
    let opts = Options::from_args(std::env::args_os());
    let config_path = opts.config_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME));
    let (config, process_config) = DaemonConfigFile::read(&config_path, &opts)?.into_configs()?;
    log::debug!("Starting with {config:?}");

    let backend = Arc::new(InMemoryBackend::new());
    let manager = DbManager::setup(config, process_config, backend)
        .await
        .context("Failed to set up the database manager")?;
    log::info!("Server database: {}", manager.server_db_id()?);

    wait_for_shutdown_signal().await?;
    log::info!("Shutting down");
    manager.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    run().await.unwrap_or_else(|err| {
        eprintln!("ADB daemon launch failed: {err:?}");
        std::process::exit(1)
    })
}
