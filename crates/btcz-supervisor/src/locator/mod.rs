//! Finding the daemon and client executables.
//!
//! [`InstallationLocator`] looks for both executables directly in the
//! installation directory and falls back to the search path. The resolved
//! [`Endpoint`] is built once at startup and shared by every component that
//! launches the daemon or its client.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::sync::Arc;

use btcz_config::Config;
use btcz_rpc::NetworkMode;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::error::LocatorError;

/// Tracing target for installation discovery.
const LOCATOR_TARGET: &str = "btcz_supervisor::locator";

/// Prefix of the daemon flag naming the export directory.
const EXPORT_DIR_FLAG: &str = "-exportdir=";

/// Resolved executables and launch settings for one daemon installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    daemon: Utf8PathBuf,
    client: Utf8PathBuf,
    export_dir: Utf8PathBuf,
    network: NetworkMode,
}

impl Endpoint {
    /// Builds an endpoint from already resolved parts.
    #[must_use]
    pub fn new(
        daemon: impl Into<Utf8PathBuf>,
        client: impl Into<Utf8PathBuf>,
        export_dir: impl Into<Utf8PathBuf>,
        network: NetworkMode,
    ) -> Self {
        Self {
            daemon: daemon.into(),
            client: client.into(),
            export_dir: export_dir.into(),
            network,
        }
    }

    /// Daemon executable.
    #[must_use]
    pub fn daemon(&self) -> &Utf8Path {
        &self.daemon
    }

    /// Command-line client executable.
    #[must_use]
    pub fn client(&self) -> &Utf8Path {
        &self.client
    }

    /// Directory the daemon writes exports and backups into.
    #[must_use]
    pub fn export_dir(&self) -> &Utf8Path {
        &self.export_dir
    }

    /// Chain the daemon is configured for.
    #[must_use]
    pub const fn network(&self) -> NetworkMode {
        self.network
    }

    /// File name of the daemon executable, as shown in process listings.
    #[must_use]
    pub fn daemon_process_name(&self) -> &str {
        self.daemon.file_name().unwrap_or(self.daemon.as_str())
    }

    /// Argument vector that launches the daemon.
    #[must_use]
    pub fn daemon_launch_argv(&self) -> Vec<String> {
        vec![
            self.daemon.to_string(),
            format!("{EXPORT_DIR_FLAG}{}", self.export_dir),
        ]
    }
}

/// Resolves an [`Endpoint`] from an installation directory.
#[derive(Debug, Clone)]
pub struct InstallationLocator {
    install_dir: Utf8PathBuf,
    daemon_name: String,
    client_name: String,
    export_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    search_path: Option<OsString>,
}

impl InstallationLocator {
    /// Creates a locator from the layered configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            install_dir: config.install_dir(),
            daemon_name: config.daemon_executable(),
            client_name: config.client_executable(),
            export_dir: config.export_dir(),
            config_path: config.daemon_config_path(),
            search_path: None,
        }
    }

    /// Replaces the search path consulted after the installation directory.
    /// Defaults to the `PATH` environment variable.
    #[must_use]
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Resolves both executables and reads the network mode.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::InstallationNotFound`] if either executable is
    /// missing, and [`LocatorError::ReadNetworkConfig`] if the daemon
    /// configuration exists but cannot be read.
    pub fn locate(&self) -> Result<Endpoint, LocatorError> {
        let daemon = self.find_executable(&self.daemon_name)?;
        let client = self.find_executable(&self.client_name)?;
        let network = detect_network_mode(&self.config_path)?;
        debug!(
            target: LOCATOR_TARGET,
            daemon = %daemon,
            client = %client,
            %network,
            "resolved installation"
        );
        Ok(Endpoint {
            daemon,
            client,
            export_dir: self.export_dir.clone(),
            network,
        })
    }

    fn find_executable(&self, name: &str) -> Result<Utf8PathBuf, LocatorError> {
        let local = self.install_dir.join(name);
        if local.is_file() {
            return Ok(local);
        }

        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        let found = which::which_in(name, search_path, self.install_dir.as_std_path())
            .ok()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok());
        match found {
            Some(path) => {
                debug!(
                    target: LOCATOR_TARGET,
                    executable = name,
                    path = %path,
                    "found executable on search path"
                );
                Ok(path)
            }
            None => Err(LocatorError::InstallationNotFound {
                executable: name.to_owned(),
                install_dir: self.install_dir.clone(),
            }),
        }
    }
}

/// Reads the daemon's `key=value` configuration file and reports whether it
/// selects the test network.
///
/// A missing file means mainnet.
///
/// # Errors
///
/// Returns [`LocatorError::ReadNetworkConfig`] if the file exists but cannot
/// be read.
pub fn detect_network_mode(config_path: &Utf8Path) -> Result<NetworkMode, LocatorError> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            warn!(
                target: LOCATOR_TARGET,
                path = %config_path,
                "daemon configuration not found, assuming mainnet"
            );
            return Ok(NetworkMode::Mainnet);
        }
        Err(error) => {
            return Err(LocatorError::ReadNetworkConfig {
                path: config_path.to_path_buf(),
                source: Arc::new(error),
            });
        }
    };
    Ok(parse_network_mode(&contents))
}

fn parse_network_mode(contents: &str) -> NetworkMode {
    let testnet = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| key.trim() == "testnet")
        .next_back()
        .is_some_and(|(_, value)| value.trim() == "1");
    if testnet {
        NetworkMode::Testnet
    } else {
        NetworkMode::Mainnet
    }
}
