use crate::format::rtsp::TransportMode;
use crate::record::RecorderOptions;
use lazy_static::lazy_static;
use log::warn;
use parking_lot::RwLock;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::load());
}

const CONFIG_PATHS: [&str; 2] = ["./config.toml", "./rtsprec_config.toml"];

/// Process-wide recorder settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory recordings are written into
    pub record_path: PathBuf,
    pub transport: TransportMode,
    pub max_redirects: usize,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
    pub pcr_sample_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        let options = RecorderOptions::default();
        Self {
            record_path: PathBuf::from("records"),
            transport: TransportMode::default(),
            max_redirects: options.max_redirects,
            connect_timeout_secs: options.connect_timeout.as_secs(),
            io_timeout_secs: options.io_timeout.as_secs(),
            pcr_sample_interval: options.pcr_sample_interval,
        }
    }
}

impl Config {
    /// Defaults, then environment variables, then the first config files found.
    fn load() -> Self {
        let mut config = Config::default();

        for (var, key) in [
            ("RTSPREC_RECORD_PATH", "record_path"),
            ("RTSPREC_TRANSPORT", "transport"),
            ("RTSPREC_MAX_REDIRECTS", "max_redirects"),
        ] {
            if let Ok(value) = env::var(var) {
                config.set(key, &value);
            }
        }

        for path in &CONFIG_PATHS {
            if let Ok(content) = std::fs::read_to_string(path) {
                config.apply_file(&content);
            }
        }

        config
    }

    /// Apply `key = value` lines; blank lines, `#` comments and `[sections]`
    /// are skipped.
    pub fn apply_file(&mut self, content: &str) {
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if !value.is_empty() {
                    self.set(key.trim(), value);
                }
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        fn number<T: std::str::FromStr>(key: &str, value: &str, slot: &mut T) {
            match value.parse() {
                Ok(parsed) => *slot = parsed,
                Err(_) => warn!("ignoring non-numeric {} = {}", key, value),
            }
        }

        match key {
            "record_path" => self.record_path = PathBuf::from(value),
            "transport" => match value.parse() {
                Ok(mode) => self.transport = mode,
                Err(e) => warn!("ignoring transport = {}: {}", value, e),
            },
            "max_redirects" => number(key, value, &mut self.max_redirects),
            "connect_timeout_secs" => number(key, value, &mut self.connect_timeout_secs),
            "io_timeout_secs" => number(key, value, &mut self.io_timeout_secs),
            "pcr_sample_interval" => number(key, value, &mut self.pcr_sample_interval),
            other => warn!("unknown config key {}", other),
        }
    }

    pub fn transport(&self) -> TransportMode {
        self.transport
    }

    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions::default()
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_io_timeout(Duration::from_secs(self.io_timeout_secs))
            .with_max_redirects(self.max_redirects)
            .with_pcr_sample_interval(self.pcr_sample_interval)
    }

    pub fn reload() {
        let fresh = Config::load();
        *CONFIG.write() = fresh;
    }
}

/// Snapshot of the process-wide configuration.
pub fn get_config() -> Config {
    CONFIG.read().clone()
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# rtsprec configuration
# Environment variables RTSPREC_RECORD_PATH, RTSPREC_TRANSPORT and
# RTSPREC_MAX_REDIRECTS are read first; values here override them.

record_path = "records"

# MP2T/TCP (raw TS) or MP2T/RTP/TCP (RTP-wrapped TS)
transport = "MP2T/TCP"

max_redirects = 5
connect_timeout_secs = 10
io_timeout_secs = 30
pcr_sample_interval = 10
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
