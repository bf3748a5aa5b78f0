//! Configuration management infrastructure.
//!
//! Signing identity locations and pipeline preferences live in a TOML file.
//! `SmimeConfiguration::identity_source` dispatches on which fields are
//! populated to pick exactly one `RawIdentitySource` variant.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::cms::SignatureMode;
use crate::domain::identity::{Passphrase, RawIdentitySource};
use crate::infra::error::{SmimeError, SmimeResult};

/// Environment variable consulted for the archive passphrase by default.
pub const DEFAULT_PASSPHRASE_ENV: &str = "SMIME_PASSPHRASE";

/// Signing preferences and identity locations.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmimeConfiguration {
    /// PEM certificate file (used with `key_path`)
    pub certificate_path: Option<PathBuf>,

    /// PEM private key file (used with `certificate_path`)
    pub key_path: Option<PathBuf>,

    /// Extra PEM certificates to embed after the signer certificate
    pub chain_paths: Vec<PathBuf>,

    /// PKCS#12 archive (used with a passphrase)
    pub archive_path: Option<PathBuf>,

    /// Archive passphrase; prefer `passphrase_env` over storing it here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// Environment variable holding the archive passphrase
    pub passphrase_env: String,

    /// `full` (signed attributes) or `minimal`
    pub signature_mode: SignatureMode,

    /// Refuse to sign messages without recipients
    pub require_recipients: bool,
}

impl Default for SmimeConfiguration {
    fn default() -> Self {
        Self {
            certificate_path: None,
            key_path: None,
            chain_paths: Vec::new(),
            archive_path: None,
            passphrase: None,
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
            signature_mode: SignatureMode::Full,
            require_recipients: true,
        }
    }
}

impl fmt::Debug for SmimeConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmimeConfiguration")
            .field("certificate_path", &self.certificate_path)
            .field("key_path", &self.key_path)
            .field("chain_paths", &self.chain_paths)
            .field("archive_path", &self.archive_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .field("passphrase_env", &self.passphrase_env)
            .field("signature_mode", &self.signature_mode)
            .field("require_recipients", &self.require_recipients)
            .finish()
    }
}

impl SmimeConfiguration {
    /// Pick the identity source described by the populated fields.
    pub fn identity_source(&self) -> SmimeResult<RawIdentitySource> {
        let has_files = self.certificate_path.is_some() || self.key_path.is_some();
        match (&self.archive_path, has_files) {
            (Some(_), true) => Err(SmimeError::Configuration(
                "Both a PKCS#12 archive and PEM files are configured; choose one".to_string(),
            )),
            (Some(path), false) => {
                let passphrase = self.resolve_passphrase().ok_or_else(|| {
                    SmimeError::Configuration(format!(
                        "PKCS#12 archive {} requires a passphrase (config or ${})",
                        path.display(),
                        self.passphrase_env
                    ))
                })?;
                Ok(RawIdentitySource::Pkcs12Archive {
                    path: path.clone(),
                    passphrase,
                })
            }
            (None, true) => match (&self.certificate_path, &self.key_path) {
                (Some(cert_path), Some(key_path)) => Ok(RawIdentitySource::SeparateFiles {
                    cert_path: cert_path.clone(),
                    key_path: key_path.clone(),
                    chain_paths: self.chain_paths.clone(),
                }),
                (Some(_), None) => Err(SmimeError::Configuration(
                    "certificate_path is set but key_path is missing".to_string(),
                )),
                _ => Err(SmimeError::Configuration(
                    "key_path is set but certificate_path is missing".to_string(),
                )),
            },
            (None, false) => Err(SmimeError::Configuration(
                "No signing identity configured: set certificate_path + key_path or archive_path + passphrase"
                    .to_string(),
            )),
        }
    }

    fn resolve_passphrase(&self) -> Option<Passphrase> {
        if let Some(passphrase) = &self.passphrase {
            return Some(Passphrase::new(passphrase.clone()));
        }
        std::env::var(&self.passphrase_env).ok().map(Passphrase::new)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("smime-signer").join("config.toml"),
            None => PathBuf::from("smime-signer-config.toml"),
        }
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SmimeResult<SmimeConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SmimeConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SmimeResult<SmimeConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SmimeError::Configuration(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SmimeConfiguration = toml::from_str(&content).map_err(|e| {
            SmimeError::Configuration(format!("Failed to parse config file: {e}"))
        })?;

        self.validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SmimeConfiguration) -> SmimeResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SmimeError::Configuration(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SmimeError::Configuration(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SmimeError::Configuration(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }

    /// Validate configuration values
    fn validate_config(&self, config: &SmimeConfiguration) -> SmimeResult<()> {
        if config.archive_path.is_some()
            && (config.certificate_path.is_some() || config.key_path.is_some())
        {
            return Err(SmimeError::Configuration(
                "archive_path cannot be combined with certificate_path/key_path".to_string(),
            ));
        }

        if config.passphrase_env.trim().is_empty() {
            return Err(SmimeError::Configuration(
                "passphrase_env must name an environment variable".to_string(),
            ));
        }

        if config.archive_path.is_some() && !config.chain_paths.is_empty() {
            log::warn!("chain_paths is ignored for PKCS#12 archives; the archive's CA certificates are used");
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
