//! Router platforms and their shared lifecycle.
//!
//! Each platform module exposes a probe that returns an adapter only when
//! the host matches. [`detect`] walks the candidates in order and returns
//! the first hit.

use std::fmt;
use std::path::Path;

use crate::config::ProxyConfig;
use crate::error::{Result, RouterError};

pub mod edgeos;
pub mod openwrt;

pub use edgeos::EdgeOs;
pub use openwrt::OpenWrt;

/// Loopback port the proxy listens on when dnsmasq keeps port 53.
pub const LISTEN_PORT: u16 = 5342;

/// Supported router operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Ubiquiti EdgeOS.
    EdgeOs,
    /// OpenWrt and derivatives.
    OpenWrt,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EdgeOs => "edgeos",
            Self::OpenWrt => "openwrt",
        })
    }
}

/// Adapter lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed by detection.
    Unconfigured,
    /// Operating mode decided, nothing touched yet.
    Configured,
    /// dnsmasq reconfigured and restarted.
    Active,
    /// Changes reverted.
    Restored,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Active => "active",
            Self::Restored => "restored",
        })
    }
}

/// Reconfigures the host's dnsmasq to cooperate with the DNS proxy.
///
/// Call order: [`configure`](Self::configure), [`setup`](Self::setup),
/// then optionally [`restore`](Self::restore) on shutdown.
pub trait Router {
    /// Platform this adapter drives.
    fn platform(&self) -> Platform;

    /// Current lifecycle state.
    fn state(&self) -> State;

    /// Location of the generated directive file.
    fn conf_path(&self) -> &Path;

    /// Chooses the operating mode and rewrites `config.listens`.
    ///
    /// With a positive cache size the proxy takes over port 53 and dnsmasq
    /// is reconfigured immediately, before the proxy binds.
    ///
    /// # Errors
    ///
    /// Fails if called twice or if the early takeover fails.
    fn configure(&mut self, config: &mut ProxyConfig) -> Result<()>;

    /// Applies the delegate-mode takeover. A no-op in cache mode.
    ///
    /// # Errors
    ///
    /// Fails if called out of order or if any takeover step fails.
    fn setup(&mut self) -> Result<()>;

    /// Reverts every persistent change and restarts dnsmasq.
    ///
    /// Not transactional: a failing step leaves earlier steps applied.
    ///
    /// # Errors
    ///
    /// Fails if not active or if any restore step fails.
    fn restore(&mut self) -> Result<()>;
}

impl State {
    /// Rejects `op` unless the adapter is in `expected`.
    pub(crate) fn require(self, op: &'static str, expected: Self) -> Result<()> {
        if self == expected {
            Ok(())
        } else {
            Err(RouterError::InvalidState { op, state: self })
        }
    }
}

/// Mode decided by [`apply_listens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mode {
    pub cache_enabled: bool,
    pub client_reporting: bool,
}

/// Points the proxy at the right listen address and reports the mode.
pub(crate) fn apply_listens(config: &mut ProxyConfig, listen_port: u16) -> Mode {
    config.listens = vec![format!("127.0.0.1:{listen_port}")];
    let cache_enabled = config.cache_enabled();
    if cache_enabled {
        config.listens = vec![":53".to_string()];
    }
    Mode {
        cache_enabled,
        client_reporting: config.report_client_info,
    }
}

type Probe = fn() -> Option<Box<dyn Router>>;

fn edgeos() -> Option<Box<dyn Router>> {
    EdgeOs::detect().map(|r| Box::new(r) as Box<dyn Router>)
}

fn openwrt() -> Option<Box<dyn Router>> {
    OpenWrt::detect().map(|r| Box::new(r) as Box<dyn Router>)
}

/// Candidates in priority order.
const PROBES: &[(Platform, Probe)] = &[
    (Platform::EdgeOs, edgeos as Probe),
    (Platform::OpenWrt, openwrt as Probe),
];

/// Returns the adapter for the running host, or `None` if no platform matches.
#[must_use]
pub fn detect() -> Option<Box<dyn Router>> {
    for (platform, probe) in PROBES {
        if let Some(router) = probe() {
            tracing::info!(%platform, "Detected router platform");
            return Some(router);
        }
        tracing::debug!(%platform, "Platform not detected");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_listens_on_loopback() {
        let mut config = ProxyConfig::new()
            .with_cache_size("0")
            .with_client_reporting(true);
        config.listens = vec!["0.0.0.0:53".into(), "[::]:53".into()];
        let mode = apply_listens(&mut config, LISTEN_PORT);
        assert_eq!(config.listens, vec!["127.0.0.1:5342"]);
        assert!(!mode.cache_enabled);
        assert!(mode.client_reporting);
    }

    #[test]
    fn cache_takes_port_53() {
        let mut config = ProxyConfig::new().with_cache_size("10MB");
        let mode = apply_listens(&mut config, LISTEN_PORT);
        assert_eq!(config.listens, vec![":53"]);
        assert!(mode.cache_enabled);
        assert!(!mode.client_reporting);
    }

    #[test]
    fn display_names() {
        assert_eq!(Platform::EdgeOs.to_string(), "edgeos");
        assert_eq!(Platform::OpenWrt.to_string(), "openwrt");
        assert_eq!(State::Active.to_string(), "active");
    }

    #[test]
    fn require_rejects_other_states() {
        assert!(State::Configured.require("setup", State::Configured).is_ok());
        let err = State::Restored.require("restore", State::Active).unwrap_err();
        assert!(matches!(
            err,
            RouterError::InvalidState {
                op: "restore",
                state: State::Restored
            }
        ));
    }

    #[test]
    fn probes_in_priority_order() {
        let order: Vec<_> = PROBES.iter().map(|(p, _)| *p).collect();
        assert_eq!(order, vec![Platform::EdgeOs, Platform::OpenWrt]);
    }
}
