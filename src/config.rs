use std::path::PathBuf;
use std::time::Duration;

/// How long an observer waits for a notice when low latency is off.
pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Environment variable the CLI reads for the socket directory.
pub const SOCKET_DIR_ENV: &str = "LOCIO_SOCKET_DIR";

#[derive(Debug, Clone)]
pub struct IoConfig {
    /// Root under which `<category>/<group>/<name>.<protocol>` socket files live.
    pub socket_dir: PathBuf,

    /// Skip heartbeat broadcasts and poll the observer without waiting.
    pub low_latency: bool,

    /// Handed to journal readers and writers; not interpreted here.
    pub lazy: bool,

    pub notice_timeout: Duration,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            socket_dir: std::env::temp_dir().join("locio").join("socket"),
            low_latency: false,
            lazy: true,
            notice_timeout: DEFAULT_NOTICE_TIMEOUT,
        }
    }
}

impl IoConfig {
    pub fn with_socket_dir(mut self, socket_dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = socket_dir.into();
        self
    }

    pub fn with_low_latency(mut self, low_latency: bool) -> Self {
        self.low_latency = low_latency;
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_notice_timeout(mut self, timeout: Duration) -> Self {
        self.notice_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = IoConfig::default();
        assert!(!cfg.low_latency);
        assert!(cfg.lazy);
        assert_eq!(cfg.notice_timeout, DEFAULT_NOTICE_TIMEOUT);
        assert!(cfg.socket_dir.ends_with("locio/socket"));
    }

    #[test]
    fn builders_override() {
        let cfg = IoConfig::default()
            .with_socket_dir("/run/kf")
            .with_low_latency(true)
            .with_lazy(false)
            .with_notice_timeout(Duration::from_millis(5));
        assert_eq!(cfg.socket_dir, PathBuf::from("/run/kf"));
        assert!(cfg.low_latency);
        assert!(!cfg.lazy);
        assert_eq!(cfg.notice_timeout, Duration::from_millis(5));
    }
}
