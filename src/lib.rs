//! # dnsmasq-shim
//!
//! Reconfigure a router's built-in dnsmasq so it cooperates with a local
//! DNS proxy, and put it back afterwards.
//!
//! Two operating modes are chosen from the proxy's cache size:
//!
//! - **delegate** (cache disabled): dnsmasq keeps port 53 and forwards
//!   everything to the proxy on `127.0.0.1:5342`.
//! - **cache** (cache size > 0): the proxy binds `:53` itself and dnsmasq's
//!   DNS role is switched off with `port=0`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dnsmasq_shim::{ProxyConfig, detect};
//!
//! let mut router = detect().ok_or("unsupported router")?;
//! let mut config = ProxyConfig::new().with_cache_size("10MB");
//!
//! router.configure(&mut config)?; // rewrites config.listens
//! router.setup()?;
//! // ... run the proxy on config.listens ...
//! router.restore()?;
//! ```
//!
//! ## Platforms
//!
//! | Platform | Detected by | Directive file |
//! |---|---|---|
//! | EdgeOS | `/config/scripts/post-config.d/` | `/etc/dnsmasq.d/dnsmasq-shim.conf` |
//! | OpenWrt | `ID=openwrt` in `/etc/os-release` | `/tmp/dnsmasq.d/dnsmasq-shim.conf` |
//!
//! ## Permissions
//!
//! Writing the directive file, editing uci and restarting dnsmasq require
//! root. EdgeOS restarts go through `sudo`; elsewhere the caller is
//! responsible for elevation.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod config;
pub mod error;
pub mod platform;
pub mod template;
pub mod uci;
pub mod util;

pub use command::{CommandRunner, SystemRunner};
pub use config::{ProxyConfig, parse_bytes};
pub use error::{CommandError, Result, RouterError};
pub use platform::{EdgeOs, LISTEN_PORT, OpenWrt, Platform, Router, State, detect};
pub use template::Directives;
