//! Minimal client for OpenWrt's `uci` configuration database.
//!
//! A miss on `get` is reported as [`RouterError::EntryNotFound`] so callers
//! can branch on it; every other failure is fatal to the caller's step.

use crate::command::CommandRunner;
use crate::error::{CommandError, Result, RouterError};

/// Path-less program name, resolved through `PATH` like the init scripts do.
pub const UCI: &str = "uci";

/// Marker `uci` prints on stderr for a missing key.
const NOT_FOUND_MARKER: &str = "Entry not found";

/// Issues `uci` verbs through a [`CommandRunner`].
#[derive(Debug, Clone, Copy)]
pub struct Uci<R> {
    runner: R,
}

impl<R: CommandRunner> Uci<R> {
    /// Wraps `runner`.
    pub const fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Reads `key`, returning trimmed output.
    ///
    /// # Errors
    ///
    /// [`RouterError::EntryNotFound`] if the key is absent, otherwise
    /// [`RouterError::Command`].
    pub fn get(&self, key: &str) -> Result<String> {
        match self.runner.run(UCI, &["get", key]) {
            Ok(out) => Ok(out.trim().to_string()),
            Err(CommandError::Exit { stderr, .. }) if stderr.contains(NOT_FOUND_MARKER) => {
                Err(RouterError::EntryNotFound {
                    key: key.to_string(),
                })
            }
            Err(source) => Err(RouterError::Command {
                op: format!("uci get {key}"),
                source,
            }),
        }
    }

    /// Deletes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Command`] on failure.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.exec("delete", &["delete", key])
    }

    /// Appends `value` to list option `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Command`] on failure.
    pub fn add_list(&self, key: &str, value: &str) -> Result<()> {
        self.exec("add_list", &["add_list", &format!("{key}={value}")])
    }

    /// Commits pending changes.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Command`] on failure.
    pub fn commit(&self) -> Result<()> {
        self.exec("commit", &["commit"])
    }

    fn exec(&self, verb: &str, args: &[&str]) -> Result<()> {
        self.runner
            .run(UCI, args)
            .map(drop)
            .map_err(|source| RouterError::Command {
                op: format!("uci {verb}"),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;

    #[test]
    fn get_trims_output() {
        let runner = FakeRunner::default();
        runner.respond("uci get dhcp.@dnsmasq[0].port", Ok("53\n".into()));
        assert_eq!(Uci::new(&runner).get("dhcp.@dnsmasq[0].port").unwrap(), "53");
    }

    #[test]
    fn get_miss_is_distinguished() {
        let runner = FakeRunner::default();
        runner.not_found("uci get dhcp.@dnsmasq[0].server");
        let err = Uci::new(&runner).get("dhcp.@dnsmasq[0].server").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn get_other_failure_propagates() {
        let runner = FakeRunner::default();
        runner.fail("uci get dhcp.@dnsmasq[0].server");
        let err = Uci::new(&runner).get("dhcp.@dnsmasq[0].server").unwrap_err();
        assert!(matches!(err, RouterError::Command { ref op, .. } if op == "uci get dhcp.@dnsmasq[0].server"));
    }

    #[test]
    fn mutations_issue_expected_commands() {
        let runner = FakeRunner::default();
        let uci = Uci::new(&runner);
        uci.delete("dhcp.@dnsmasq[0].port").unwrap();
        uci.add_list("dhcp.@dnsmasq[0].server", "1.1.1.1").unwrap();
        uci.commit().unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "uci delete dhcp.@dnsmasq[0].port",
                "uci add_list dhcp.@dnsmasq[0].server=1.1.1.1",
                "uci commit",
            ]
        );
    }

    #[test]
    fn commit_failure_is_fatal() {
        let runner = FakeRunner::default();
        runner.fail("uci commit");
        let err = Uci::new(&runner).commit().unwrap_err();
        assert_eq!(err.to_string(), "uci commit: exit status 2: failed");
    }
}
