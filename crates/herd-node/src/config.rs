//! Daemon configuration for the herd service.
//!
//! [`HerdConfig`] carries every tunable with defaults taken from
//! [`herd_core::constants`]. It is layered with the `config` crate: the
//! built-in defaults, then an optional TOML file, then environment
//! variables prefixed `HERD_` (e.g. `HERD_RPC_PORT=18500`).

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use herd_core::constants::{
    BPS_PRECISION, DEFAULT_RPC_PORT, HEADBUTT_COOLDOWN_SECS, HERD_FRACTION_BPS, MAX_HERD_SIZE,
    MIN_RECEIPT_AMOUNT, RESET_HOUR_UTC, RESET_MINUTE_UTC,
};
use herd_core::cycle::CycleSchedule;
use herd_core::error::ConfigError;

/// Longest accepted headbutt cooldown.
const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Configuration for a herd service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HerdConfig {
    /// Maximum number of simultaneous members (N).
    pub max_herd_size: usize,
    /// Smallest receipt amount that counts, in sats.
    pub min_receipt_amount: u64,
    /// Herd's portion of each trigger amount, in basis points.
    pub herd_fraction_bps: u64,
    /// Lock-out after a successful headbutt. Zero disables it.
    pub headbutt_cooldown_secs: u64,
    /// Daily reset time, UTC.
    pub reset_hour_utc: u32,
    pub reset_minute_utc: u32,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "herd_node_lib=trace").
    pub log_level: String,
    /// Label of the fixed split-payment recipient.
    pub treasury_alias: String,
    /// Destination of the fixed split-payment recipient.
    pub treasury_destination: String,
    /// Admission note for the first cycle, if known at startup.
    pub admission_reference: Option<String>,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            max_herd_size: MAX_HERD_SIZE,
            min_receipt_amount: MIN_RECEIPT_AMOUNT,
            herd_fraction_bps: HERD_FRACTION_BPS,
            headbutt_cooldown_secs: HEADBUTT_COOLDOWN_SECS,
            reset_hour_utc: RESET_HOUR_UTC,
            reset_minute_utc: RESET_MINUTE_UTC,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            treasury_alias: "treasury".to_string(),
            treasury_destination: String::new(),
            admission_reference: None,
        }
    }
}

impl HerdConfig {
    /// Load from `path` (or [`default_config_path`] when `None`) and the
    /// environment, then validate.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("HERD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_herd_size == 0 {
            return Err(ConfigError::Invalid("max_herd_size must be at least 1".into()));
        }
        if self.herd_fraction_bps > BPS_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "herd_fraction_bps {} exceeds {BPS_PRECISION}",
                self.herd_fraction_bps
            )));
        }
        if self.headbutt_cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(ConfigError::Invalid(format!(
                "headbutt_cooldown_secs {} exceeds {MAX_COOLDOWN_SECS}",
                self.headbutt_cooldown_secs
            )));
        }
        self.cycle_schedule()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }

    pub fn headbutt_cooldown(&self) -> Duration {
        Duration::seconds(self.headbutt_cooldown_secs.min(MAX_COOLDOWN_SECS) as i64)
    }

    pub fn cycle_schedule(&self) -> Result<CycleSchedule, herd_core::error::CycleError> {
        CycleSchedule::new(self.reset_hour_utc, self.reset_minute_utc)
    }
}

/// `<config_dir>/herd/herd.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("herd").join("herd.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_constants() {
        let cfg = HerdConfig::default();
        assert_eq!(cfg.max_herd_size, 3);
        assert_eq!(cfg.min_receipt_amount, 10);
        assert_eq!(cfg.herd_fraction_bps, 1_000);
        assert_eq!(cfg.headbutt_cooldown_secs, 5);
        assert_eq!(cfg.rpc_port, DEFAULT_RPC_PORT);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rpc_addr_format() {
        let cfg = HerdConfig {
            rpc_bind: "0.0.0.0".to_string(),
            rpc_port: 9999,
            ..HerdConfig::default()
        };
        assert_eq!(cfg.rpc_addr(), "0.0.0.0:9999");
    }

    // ------------------------------------------------------------------
    // validate
    // ------------------------------------------------------------------

    #[test]
    fn zero_herd_size_rejected() {
        let cfg = HerdConfig { max_herd_size: 0, ..HerdConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn fraction_above_whole_rejected() {
        let cfg = HerdConfig { herd_fraction_bps: 10_001, ..HerdConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn day_long_cooldown_is_the_limit() {
        let ok = HerdConfig { headbutt_cooldown_secs: 86_400, ..HerdConfig::default() };
        assert!(ok.validate().is_ok());
        let too_long = HerdConfig { headbutt_cooldown_secs: 86_401, ..HerdConfig::default() };
        assert!(matches!(too_long.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_reset_time_rejected() {
        let cfg = HerdConfig { reset_hour_utc: 25, ..HerdConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    // ------------------------------------------------------------------
    // load
    // ------------------------------------------------------------------

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herd.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "max_herd_size = 5").unwrap();
        writeln!(f, "rpc_port = 18999").unwrap();
        writeln!(f, "treasury_destination = \"vault@ln.example\"").unwrap();
        drop(f);

        let cfg = HerdConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_herd_size, 5);
        assert_eq!(cfg.rpc_port, 18999);
        assert_eq!(cfg.treasury_destination, "vault@ln.example");
        // Unset keys keep their defaults.
        assert_eq!(cfg.min_receipt_amount, MIN_RECEIPT_AMOUNT);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HerdConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.max_herd_size, MAX_HERD_SIZE);
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herd.toml");
        std::fs::write(&path, "max_herd_size = 0\n").unwrap();
        assert!(matches!(HerdConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herd.toml");
        std::fs::write(&path, "max_herd_size = \"lots\"\n").unwrap();
        assert!(matches!(HerdConfig::load(Some(&path)), Err(ConfigError::Load(_))));
    }

    #[test]
    fn default_path_ends_with_herd_toml() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("herd/herd.toml"));
        }
    }

    #[test]
    fn cooldown_duration() {
        assert_eq!(HerdConfig::default().headbutt_cooldown(), Duration::seconds(5));
    }
}
