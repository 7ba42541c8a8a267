//! dnsmasq directive file rendering.

use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Result, RouterError};

/// First line of every generated file.
pub const HEADER: &str = "# Configuration generated by dnsmasq-shim";

/// Mode of the generated file.
pub const FILE_MODE: u32 = 0o644;

/// Inputs of the directive file.
///
/// Rendering is a pure function of these fields.
///
/// ```text
/// # Configuration generated by dnsmasq-shim
/// no-resolv
/// server=127.0.0.1#5342
/// add-mac
/// add-subnet=32,128
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directives {
    /// The proxy owns port 53; dnsmasq's DNS role is disabled.
    pub cache_enabled: bool,
    /// No database port entry existed, so `port=0` is forced.
    pub set_port0: bool,
    /// Forward client MAC and subnet to the proxy.
    pub client_reporting: bool,
    /// Loopback port the proxy listens on in delegate mode.
    pub listen_port: u16,
}

impl Directives {
    /// Renders the file content. Every line ends with `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(128);
        out.push_str(HEADER);
        out.push('\n');

        // set_port0 only decides whether the database edit was needed;
        // the directive is the same either way.
        if self.cache_enabled {
            out.push_str("port=0\n");
            return out;
        }

        out.push_str("no-resolv\n");
        out.push_str(&format!("server=127.0.0.1#{}\n", self.listen_port));
        if self.client_reporting {
            out.push_str("add-mac\n");
            out.push_str("add-subnet=32,128\n");
        }
        out
    }

    /// Renders and writes the file to `path` with mode `0644`,
    /// replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Write`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let wrap = |source| RouterError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::write(path, self.render()).map_err(wrap)?;
        fs::set_permissions(path, Permissions::from_mode(FILE_MODE)).map_err(wrap)?;

        tracing::debug!(path = %path.display(), cache = self.cache_enabled, "Wrote dnsmasq directives");
        Ok(())
    }
}
