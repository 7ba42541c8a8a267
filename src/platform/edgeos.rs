//! Ubiquiti EdgeOS.
//!
//! dnsmasq is configured purely through files under `/etc/dnsmasq.d/` and
//! restarted through `sudo`. There is no configuration database to edit.

use std::path::{Path, PathBuf};

use super::{LISTEN_PORT, Platform, Router, State, apply_listens};
use crate::command::{CommandRunner, SystemRunner, restart_dnsmasq};
use crate::config::ProxyConfig;
use crate::error::{Result, RouterError};
use crate::template::Directives;
use crate::util::is_dir;

/// Directory whose presence identifies EdgeOS.
pub const MARKER_DIR: &str = "/config/scripts/post-config.d";

/// Generated directive file.
pub const CONF_PATH: &str = "/etc/dnsmasq.d/dnsmasq-shim.conf";

/// EdgeOS router adapter.
#[derive(Debug)]
pub struct EdgeOs<R = SystemRunner> {
    conf_path: PathBuf,
    listen_port: u16,
    client_reporting: bool,
    cache_enabled: bool,
    state: State,
    runner: R,
}

impl EdgeOs {
    /// Creates an adapter with the default paths and real commands.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conf_path: PathBuf::from(CONF_PATH),
            listen_port: LISTEN_PORT,
            client_reporting: false,
            cache_enabled: false,
            state: State::Unconfigured,
            runner: SystemRunner,
        }
    }

    /// Returns an adapter if [`MARKER_DIR`] is a directory.
    #[must_use]
    pub fn detect() -> Option<Self> {
        Self::probe(Path::new(MARKER_DIR))
    }

    /// Returns an adapter if `marker` is a directory.
    #[must_use]
    pub fn probe(marker: &Path) -> Option<Self> {
        is_dir(marker).then(Self::new)
    }
}

impl Default for EdgeOs {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> EdgeOs<R> {
    /// Overrides the directive file location.
    #[must_use]
    pub fn with_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_path = path.into();
        self
    }

    /// Replaces the command runner.
    #[must_use]
    pub fn with_runner<T: CommandRunner>(self, runner: T) -> EdgeOs<T> {
        EdgeOs {
            conf_path: self.conf_path,
            listen_port: self.listen_port,
            client_reporting: self.client_reporting,
            cache_enabled: self.cache_enabled,
            state: self.state,
            runner,
        }
    }

    /// Returns `true` once the proxy owns port 53.
    #[must_use]
    pub const fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    const fn directives(&self) -> Directives {
        Directives {
            cache_enabled: self.cache_enabled,
            set_port0: false,
            client_reporting: self.client_reporting,
            listen_port: self.listen_port,
        }
    }

    fn takeover(&mut self) -> Result<()> {
        self.directives().write(&self.conf_path)?;
        restart_dnsmasq(&self.runner, true)?;
        self.state = State::Active;
        tracing::info!(
            path = %self.conf_path.display(),
            cache = self.cache_enabled,
            "EdgeOS dnsmasq reconfigured"
        );
        Ok(())
    }
}

impl<R: CommandRunner> Router for EdgeOs<R> {
    fn platform(&self) -> Platform {
        Platform::EdgeOs
    }

    fn state(&self) -> State {
        self.state
    }

    fn conf_path(&self) -> &Path {
        &self.conf_path
    }

    fn configure(&mut self, config: &mut ProxyConfig) -> Result<()> {
        self.state.require("configure", State::Unconfigured)?;
        let mode = apply_listens(config, self.listen_port);
        self.client_reporting = mode.client_reporting;
        self.cache_enabled = mode.cache_enabled;
        self.state = State::Configured;
        tracing::info!(cache = mode.cache_enabled, listens = ?config.listens, "Configured");

        if self.cache_enabled {
            // dnsmasq must leave port 53 before the proxy binds it.
            self.takeover()?;
        }
        Ok(())
    }

    fn setup(&mut self) -> Result<()> {
        match self.state {
            State::Configured => self.takeover(),
            State::Active if self.cache_enabled => Ok(()),
            state => Err(RouterError::InvalidState { op: "setup", state }),
        }
    }

    fn restore(&mut self) -> Result<()> {
        self.state.require("restore", State::Active)?;
        std::fs::remove_file(&self.conf_path).map_err(|source| RouterError::Remove {
            path: self.conf_path.clone(),
            source,
        })?;
        restart_dnsmasq(&self.runner, true)?;
        self.state = State::Restored;
        tracing::info!(path = %self.conf_path.display(), "EdgeOS dnsmasq restored");
        Ok(())
    }
}
