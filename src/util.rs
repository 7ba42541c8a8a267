//! Read-only host probes used by platform detection.

use std::collections::HashMap;
use std::path::Path;

/// Default location of the OS identification file.
pub const OS_RELEASE: &str = "/etc/os-release";

/// Returns `true` if `path` exists and is a directory. Errors count as `false`.
#[must_use]
pub fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_dir())
}

/// Reads an os-release style file into a key/value map.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn read_os_release(path: &Path) -> std::io::Result<HashMap<String, String>> {
    std::fs::read_to_string(path).map(|content| parse_os_release(&content))
}

/// Parses `KEY=value` lines. Blank lines and `#` comments are skipped and
/// one level of single or double quotes is stripped from values.
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openwrt_release() {
        let m = parse_os_release(
            "NAME=\"OpenWrt\"\nVERSION=\"23.05.2\"\nID=\"openwrt\"\n# comment\n\nID_LIKE='lede openwrt'\nBUILD_ID=r23630\n",
        );
        assert_eq!(m["ID"], "openwrt");
        assert_eq!(m["NAME"], "OpenWrt");
        assert_eq!(m["ID_LIKE"], "lede openwrt");
        assert_eq!(m["BUILD_ID"], "r23630");
        assert!(!m.contains_key("# comment"));
    }

    #[test]
    fn value_may_contain_equals() {
        let m = parse_os_release("HOME_URL=https://x.org/?a=b\n");
        assert_eq!(m["HOME_URL"], "https://x.org/?a=b");
    }

    #[test]
    fn is_dir_distinguishes_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "").unwrap();
        assert!(is_dir(dir.path()));
        assert!(!is_dir(&file));
        assert!(!is_dir(&dir.path().join("missing")));
    }

    #[test]
    fn read_missing_file_errors() {
        assert!(read_os_release(Path::new("/nonexistent/os-release")).is_err());
    }
}
