//! # Engine configuration.
//!
//! [`Config`] holds the process-wide defaults for the composition engine.
//! Today that is a single knob: the default timeout applied by
//! [`Composable::wait`](crate::Composable::wait).
//!
//! The default is read once, at first use, from the environment variable
//! [`MAX_AWAIT_TIMEOUT_ENV`]. The value is an integer with an optional unit
//! suffix: `ns`, `ms`, or `s` (no suffix means seconds). A value that fails
//! to parse is logged and ignored, leaving the built-in default of 30
//! seconds in place.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use reflow::Config;
//!
//! let cfg = Config::default();
//! assert_eq!(cfg.max_await_timeout, Duration::from_secs(30));
//! ```

use std::num::ParseIntError;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Environment variable naming the default `wait` timeout, e.g. `500ms`.
pub const MAX_AWAIT_TIMEOUT_ENV: &str = "REACTOR_MAX_AWAIT_TIMEOUT";

const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(30);

static GLOBAL: Lazy<Config> = Lazy::new(Config::from_env);

/// Process-wide engine configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Default timeout for [`Composable::wait`](crate::Composable::wait).
    pub max_await_timeout: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `max_await_timeout = 30s`
    fn default() -> Self {
        Self {
            max_await_timeout: DEFAULT_AWAIT_TIMEOUT,
        }
    }
}

impl Config {
    /// Builds a configuration from the environment, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Ok(raw) = std::env::var(MAX_AWAIT_TIMEOUT_ENV) {
            if !raw.is_empty() {
                match parse_timeout(&raw) {
                    Ok(timeout) => cfg.max_await_timeout = timeout,
                    Err(e) => {
                        log::warn!("ignoring {MAX_AWAIT_TIMEOUT_ENV}={raw:?}: {e}");
                    }
                }
            }
        }
        cfg
    }
}

/// The lazily-initialized process-wide default `wait` timeout.
pub(crate) fn default_await_timeout() -> Duration {
    GLOBAL.max_await_timeout
}

/// Parses `<integer><ns|ms|s>`; a bare integer means seconds.
fn parse_timeout(raw: &str) -> Result<Duration, ParseIntError> {
    let raw = raw.trim();
    let (digits, unit) = if let Some(d) = raw.strip_suffix("ns") {
        (d, Unit::Nanos)
    } else if let Some(d) = raw.strip_suffix("ms") {
        (d, Unit::Millis)
    } else if let Some(d) = raw.strip_suffix('s') {
        (d, Unit::Secs)
    } else {
        (raw, Unit::Secs)
    };
    let n: u64 = digits.trim().parse()?;
    Ok(match unit {
        Unit::Nanos => Duration::from_nanos(n),
        Unit::Millis => Duration::from_millis(n),
        Unit::Secs => Duration::from_secs(n),
    })
}

enum Unit {
    Nanos,
    Millis,
    Secs,
}
