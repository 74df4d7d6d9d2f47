//! TOML-based configuration for the provisioning and discovery flows.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\BabyLink\config.toml`
//! - Linux:    `~/.config/babylink/config.toml`
//! - macOS:    `~/Library/Application Support/BabyLink/config.toml`
//!
//! The file is optional and read-only: nothing in this crate persists state,
//! so there is no save path.
//!
//! # Example (for beginners)
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [radio]
//! scan_window_secs = 8
//! name_allow_list = ["Baby", "Pico"]
//!
//! [socket]
//! device_address = "192.168.4.1"
//! command_timeout_secs = 15
//! ```
//!
//! Every section and every key may be omitted.  `#[serde(default)]` fills
//! the gaps from the `Default` impls below, so an empty file, a missing file
//! and a file written for an older release all load.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use babylink_core::protocol::broadcast::DEFAULT_DISCOVERY_PORT;
use babylink_core::protocol::radio::{CharacteristicEncoding, DEFAULT_NAME_ALLOW_LIST, REQUESTED_MTU};
use babylink_core::protocol::socket::{DEFAULT_DEVICE_ADDRESS, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest ATT MTU a Bluetooth LE link may negotiate.
const MIN_MTU: u16 = 23;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used.
    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub radio: RadioConfig,
    pub socket: SocketConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Radio provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadioConfig {
    /// Hard scan window; scanning stops when it elapses.
    pub scan_window_secs: u64,
    /// How often the central is polled for new peripherals during a scan.
    pub scan_poll_interval_ms: u64,
    /// Substrings an advertised name must contain (any one of them).
    pub name_allow_list: Vec<String>,
    /// MTU requested on connect.
    pub requested_mtu: u16,
    /// Bound on each connect, discover, read and write step.
    pub step_timeout_secs: u64,
    /// Overrides how the radio stack presents characteristic values.
    /// Unset means the central's own view is used.
    pub value_encoding: Option<CharacteristicEncoding>,
}

/// Socket provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocketConfig {
    /// Address of the unit on its own access point.
    pub device_address: IpAddr,
    pub port: u16,
    /// Bound on each command's full exchange.
    pub command_timeout_secs: u64,
}

/// Broadcast discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// `0.0.0.0` listens on all interfaces.
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            scan_window_secs: 5,
            scan_poll_interval_ms: 250,
            name_allow_list: DEFAULT_NAME_ALLOW_LIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            requested_mtu: REQUESTED_MTU,
            step_timeout_secs: 10,
            value_encoding: None,
        }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            device_address: IpAddr::V4(DEFAULT_DEVICE_ADDRESS),
            port: DEFAULT_PORT,
            command_timeout_secs: 10,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_DISCOVERY_PORT,
        }
    }
}

impl RadioConfig {
    pub fn scan_window(&self) -> Duration {
        Duration::from_secs(self.scan_window_secs)
    }

    pub fn scan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl SocketConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl AppConfig {
    /// Parses a TOML document and validates the result.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for values no flow can run with.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero-length windows and timeouts, an empty allow-list and an
    /// MTU below the Bluetooth minimum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("radio.scan_window_secs", self.radio.scan_window_secs),
            ("radio.scan_poll_interval_ms", self.radio.scan_poll_interval_ms),
            ("radio.step_timeout_secs", self.radio.step_timeout_secs),
            ("socket.command_timeout_secs", self.socket.command_timeout_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.radio.name_allow_list.iter().all(|s| s.is_empty()) {
            return Err(ConfigError::Invalid {
                key: "radio.name_allow_list",
                reason: "needs at least one non-empty entry".to_string(),
            });
        }
        if self.radio.requested_mtu < MIN_MTU {
            return Err(ConfigError::Invalid {
                key: "radio.requested_mtu",
                reason: format!("must be at least {MIN_MTU}"),
            });
        }
        Ok(())
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if a value is unusable.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => AppConfig::from_toml_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Resolves the platform config base directory including the `BabyLink` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("BabyLink"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("babylink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("BabyLink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_matches_unit_firmware() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(
            cfg.socket.device_address,
            IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1))
        );
        assert_eq!(cfg.socket.port, 80);
        assert_eq!(cfg.discovery.port, 12345);
        assert_eq!(cfg.radio.requested_mtu, 23);
    }

    #[test]
    fn test_radio_config_default_durations() {
        let cfg = RadioConfig::default();
        assert_eq!(cfg.scan_window(), Duration::from_secs(5));
        assert_eq!(cfg.scan_poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.step_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.value_encoding, None);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = AppConfig::from_toml_str("").expect("empty document");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_named_keys() {
        // Arrange
        let toml_str = r#"
[radio]
scan_window_secs = 8
value_encoding = "raw"

[socket]
device_address = "10.0.0.1"
"#;

        // Act
        let cfg = AppConfig::from_toml_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.radio.scan_window_secs, 8);
        assert_eq!(cfg.radio.value_encoding, Some(CharacteristicEncoding::Raw));
        assert_eq!(cfg.radio.step_timeout_secs, 10);
        assert_eq!(cfg.socket.device_address, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(cfg.socket.port, 80);
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result = AppConfig::from_toml_str("[[[ not valid toml");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_address_returns_parse_error() {
        let result = AppConfig::from_toml_str("[socket]\ndevice_address = \"unit.local\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_zero_command_timeout_is_rejected() {
        let result = AppConfig::from_toml_str("[socket]\ncommand_timeout_secs = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "socket.command_timeout_secs", .. })
        ));
    }

    #[test]
    fn test_empty_allow_list_is_rejected() {
        let result = AppConfig::from_toml_str("[radio]\nname_allow_list = []\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "radio.name_allow_list", .. })
        ));
    }

    #[test]
    fn test_mtu_below_minimum_is_rejected() {
        let result = AppConfig::from_toml_str("[radio]\nrequested_mtu = 20\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "radio.requested_mtu", .. })
        ));
    }

    // ── Loading from disk ─────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config_from(&path).expect("missing file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_temp_file() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("babylink_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n[discovery]\nport = 5000\n")
            .unwrap();

        // Act
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded.general.log_level, "debug");
        assert_eq!(loaded.discovery.port, 5000);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
    }
}
