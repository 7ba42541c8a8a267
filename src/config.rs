//! Settings shared with the DNS proxy.

use crate::error::{Result, RouterError};

/// The slice of the DNS proxy's configuration that router adapters read
/// and mutate.
///
/// # Example
///
/// ```
/// use dnsmasq_shim::ProxyConfig;
///
/// let config = ProxyConfig::new()
///     .with_cache_size("10MB")
///     .with_client_reporting(true);
///
/// assert_eq!(config.cache_bytes(), 10 * 1024 * 1024);
/// assert!(config.report_client_info);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Addresses the proxy binds, rewritten by [`Router::configure`](crate::Router::configure).
    pub listens: Vec<String>,

    /// Whether the proxy reports client MAC and subnet upstream.
    pub report_client_info: bool,

    /// Cache size in byte-size syntax (`"0"`, `"512kB"`, `"10MB"`).
    pub cache_size: String,
}

impl ProxyConfig {
    /// Creates an empty config: no listens, no reporting, cache size `""`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache size string.
    #[must_use]
    pub fn with_cache_size(mut self, size: impl Into<String>) -> Self {
        self.cache_size = size.into();
        self
    }

    /// Sets client info reporting.
    #[must_use]
    pub const fn with_client_reporting(mut self, enabled: bool) -> Self {
        self.report_client_info = enabled;
        self
    }

    /// Cache size in bytes. Unparseable sizes count as zero.
    #[must_use]
    pub fn cache_bytes(&self) -> u64 {
        parse_bytes(&self.cache_size).unwrap_or(0)
    }

    /// Returns `true` when the proxy should own port 53 and cache itself.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_bytes() > 0
    }
}

/// Parses a byte size such as `"10MB"`, `"1.5G"`, `"512k"` or `"42"`.
///
/// Units are case-insensitive binary multiples up to `T`. A decimal
/// mantissa is allowed; the result is rounded down to whole bytes. An
/// empty string is zero.
///
/// # Errors
///
/// Returns [`RouterError::InvalidConfig`] for malformed input or overflow.
pub fn parse_bytes(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    let invalid = || RouterError::InvalidConfig(format!("invalid byte size: {s:?}"));

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let (int, frac) = number.split_once('.').unwrap_or((number, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
        return Err(invalid());
    }

    let multiplier: u128 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        other => {
            return Err(RouterError::InvalidConfig(format!(
                "unknown byte size unit: {other:?}"
            )));
        }
    };

    let out_of_range = || RouterError::InvalidConfig(format!("byte size out of range: {s:?}"));
    let whole = if int.is_empty() {
        0
    } else {
        int.parse::<u128>().map_err(|_| out_of_range())?
    };
    // Digits past 18 cannot change the result at these magnitudes.
    let frac = &frac[..frac.len().min(18)];
    let fraction = if frac.is_empty() {
        0
    } else {
        let digits = frac.parse::<u128>().map_err(|_| invalid())?;
        let scale = 10u128.pow(u32::try_from(frac.len()).map_err(|_| invalid())?);
        digits * multiplier / scale
    };

    whole
        .checked_mul(multiplier)
        .and_then(|n| n.checked_add(fraction))
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(out_of_range)
}
