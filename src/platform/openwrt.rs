//! OpenWrt.
//!
//! Besides the directive file under `/tmp/dnsmasq.d/`, the dnsmasq section
//! of the `dhcp` uci package is edited so it does not fight the generated
//! directives:
//!
//! - cache mode: a default `port` of 53 is deleted so `port=0` is accepted
//! - delegate mode: custom upstream `server` entries are saved and deleted,
//!   and added back on restore

use std::path::{Path, PathBuf};

use super::{LISTEN_PORT, Platform, Router, State, apply_listens};
use crate::command::{CommandRunner, SystemRunner, restart_dnsmasq};
use crate::config::ProxyConfig;
use crate::error::{Result, RouterError};
use crate::template::Directives;
use crate::uci::Uci;
use crate::util::{OS_RELEASE, read_os_release};

/// Generated directive file.
pub const CONF_PATH: &str = "/tmp/dnsmasq.d/dnsmasq-shim.conf";

/// uci key of dnsmasq's listen port.
pub const PORT_KEY: &str = "dhcp.@dnsmasq[0].port";

/// uci key of dnsmasq's upstream server list.
pub const SERVER_KEY: &str = "dhcp.@dnsmasq[0].server";

/// `ID` value in os-release.
const OS_ID: &str = "openwrt";

/// OpenWrt router adapter.
#[derive(Debug)]
pub struct OpenWrt<R = SystemRunner> {
    conf_path: PathBuf,
    listen_port: u16,
    client_reporting: bool,
    cache_enabled: bool,
    set_port0: bool,
    saved_forwarders: Vec<String>,
    state: State,
    runner: R,
}

impl OpenWrt {
    /// Creates an adapter with the default paths and real commands.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conf_path: PathBuf::from(CONF_PATH),
            listen_port: LISTEN_PORT,
            client_reporting: false,
            cache_enabled: false,
            set_port0: false,
            saved_forwarders: Vec::new(),
            state: State::Unconfigured,
            runner: SystemRunner,
        }
    }

    /// Returns an adapter if `/etc/os-release` identifies OpenWrt.
    #[must_use]
    pub fn detect() -> Option<Self> {
        Self::probe(Path::new(OS_RELEASE))
    }

    /// Returns an adapter if the os-release file at `path` has `ID=openwrt`.
    /// Read failures count as a miss.
    #[must_use]
    pub fn probe(path: &Path) -> Option<Self> {
        match read_os_release(path) {
            Ok(release) if release.get("ID").is_some_and(|id| id == OS_ID) => Some(Self::new()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read os-release");
                None
            }
        }
    }
}

impl Default for OpenWrt {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> OpenWrt<R> {
    /// Overrides the directive file location.
    #[must_use]
    pub fn with_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_path = path.into();
        self
    }

    /// Replaces the command runner.
    #[must_use]
    pub fn with_runner<T: CommandRunner>(self, runner: T) -> OpenWrt<T> {
        OpenWrt {
            conf_path: self.conf_path,
            listen_port: self.listen_port,
            client_reporting: self.client_reporting,
            cache_enabled: self.cache_enabled,
            set_port0: self.set_port0,
            saved_forwarders: self.saved_forwarders,
            state: self.state,
            runner,
        }
    }

    /// Returns `true` once the proxy owns port 53.
    #[must_use]
    pub const fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Returns `true` if no port entry existed and `port=0` is forced.
    #[must_use]
    pub const fn set_port0(&self) -> bool {
        self.set_port0
    }

    /// Upstream servers removed from uci, in original order.
    #[must_use]
    pub fn saved_forwarders(&self) -> &[String] {
        &self.saved_forwarders
    }

    const fn directives(&self) -> Directives {
        Directives {
            cache_enabled: self.cache_enabled,
            set_port0: self.set_port0,
            client_reporting: self.client_reporting,
            listen_port: self.listen_port,
        }
    }

    fn takeover(&mut self) -> Result<()> {
        if self.cache_enabled {
            self.release_port()?;
        } else {
            self.capture_forwarders()?;
        }

        self.directives().write(&self.conf_path)?;
        restart_dnsmasq(&self.runner, false)?;
        self.state = State::Active;
        tracing::info!(
            path = %self.conf_path.display(),
            cache = self.cache_enabled,
            set_port0 = self.set_port0,
            "OpenWrt dnsmasq reconfigured"
        );
        Ok(())
    }

    /// dnsmasq refuses to start if `port` is set twice, so a default
    /// `port=53` entry has to go before `port=0` is written.
    fn release_port(&mut self) -> Result<()> {
        let uci = Uci::new(&self.runner);
        match uci.get(PORT_KEY) {
            Ok(port) if port == "53" => {
                uci.delete(PORT_KEY)?;
                uci.commit()?;
                tracing::debug!("Deleted default dnsmasq port entry");
            }
            Ok(port) => tracing::debug!(%port, "Keeping custom dnsmasq port entry"),
            Err(e) if e.is_not_found() => self.set_port0 = true,
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Saves and deletes custom upstream servers; the proxy forwards instead.
    fn capture_forwarders(&mut self) -> Result<()> {
        let uci = Uci::new(&self.runner);
        let servers = match uci.get(SERVER_KEY) {
            Ok(servers) => servers,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        uci.delete(SERVER_KEY)?;
        // Recorded once the database diverges, so restore can undo it even
        // if a later step fails.
        self.saved_forwarders = servers.split_whitespace().map(str::to_string).collect();
        uci.commit()?;
        tracing::debug!(servers = ?self.saved_forwarders, "Saved upstream servers");
        Ok(())
    }
}

impl<R: CommandRunner> Router for OpenWrt<R> {
    fn platform(&self) -> Platform {
        Platform::OpenWrt
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

    /// Also accepted while still configured if a failed setup already
    /// removed upstream servers from uci, so they can be put back.
    fn restore(&mut self) -> Result<()> {
        match self.state {
            State::Active => {}
            State::Configured if !self.saved_forwarders.is_empty() => {
                tracing::warn!(servers = ?self.saved_forwarders, "Restoring after failed setup");
            }
            state => return Err(RouterError::InvalidState { op: "restore", state }),
        }

        let saved = std::mem::take(&mut self.saved_forwarders);
        if !saved.is_empty() {
            let uci = Uci::new(&self.runner);
            for server in &saved {
                uci.add_list(SERVER_KEY, server)?;
            }
            uci.commit()?;
            tracing::debug!(servers = ?saved, "Restored upstream servers");
        }

        // The file lives on tmpfs and may already be gone.
        if let Err(e) = std::fs::remove_file(&self.conf_path) {
            tracing::debug!(path = %self.conf_path.display(), error = %e, "Ignoring remove failure");
        }

        restart_dnsmasq(&self.runner, false)?;
        self.state = State::Restored;
        tracing::info!(path = %self.conf_path.display(), "OpenWrt dnsmasq restored");
        Ok(())
    }
}
