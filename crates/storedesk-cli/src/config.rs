// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storedesk_app::DEFAULT_RESPONSIVE_BREAKPOINT;
use url::Url;

pub const APP_NAME: &str = "storedesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_API_TIMEOUT: &str = "10s";
const DEFAULT_SUDO_LETTERS: &str = "abcdefghij";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_PATH_ENV: &str = "STOREDESK_CONFIG_PATH";
const API_URL_ENV: &str = "STOREDESK_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub invoice: Invoice,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            invoice: Invoice::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Invoice {
    pub sudo_letters: Option<String>,
    pub default_inbound_tax_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub responsive_breakpoint: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub dir: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.validate(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let base_url = self.api_base_url();
        let parsed = Url::parse(&base_url).with_context(|| {
            format!(
                "api.base_url {base_url:?} in {} is not a valid URL",
                path.display()
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url in {} must use http or https, got {:?}",
                path.display(),
                parsed.scheme()
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(letters) = &self.invoice.sudo_letters {
            validate_sudo_alphabet(letters).with_context(|| {
                format!("invoice.sudo_letters in {} is invalid", path.display())
            })?;
        }

        if let Some(tax) = self.invoice.default_inbound_tax_percent {
            if !(tax.is_finite() && tax >= 0.0) {
                bail!(
                    "invoice.default_inbound_tax_percent in {} must be non-negative, got {}",
                    path.display(),
                    tax
                );
            }
        }

        if let Some(breakpoint) = self.ui.responsive_breakpoint {
            if !(1..=i64::from(u16::MAX)).contains(&breakpoint) {
                bail!(
                    "ui.responsive_breakpoint in {} must be a positive column count, got {}",
                    path.display(),
                    breakpoint
                );
            }
        }

        Ok(())
    }

    /// The file wins; `STOREDESK_API_URL` only fills an unset value.
    pub fn api_base_url(&self) -> String {
        let configured = self
            .api
            .base_url
            .clone()
            .or_else(|| env::var(API_URL_ENV).ok().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        configured.trim().trim_end_matches('/').to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn sudo_letters(&self) -> &str {
        self.invoice
            .sudo_letters
            .as_deref()
            .unwrap_or(DEFAULT_SUDO_LETTERS)
    }

    pub fn default_inbound_tax_percent(&self) -> f64 {
        self.invoice.default_inbound_tax_percent.unwrap_or(0.0)
    }

    pub fn responsive_breakpoint(&self) -> u16 {
        self.ui
            .responsive_breakpoint
            .and_then(|breakpoint| u16::try_from(breakpoint).ok())
            .unwrap_or(DEFAULT_RESPONSIVE_BREAKPOINT)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.log.dir {
            return Ok(PathBuf::from(dir));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].dir in the config file")
        })?;
        Ok(data_root.join(APP_NAME).join("logs"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# storedesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# STOREDESK_API_URL is used when base_url is not set here.\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[invoice]\n# Position of each letter is its digit: a=0, b=1, ...\nsudo_letters = \"{}\"\ndefault_inbound_tax_percent = 0\n\n[ui]\n# Narrower terminals show only the first two columns of a list.\nresponsive_breakpoint = {}\n\n[log]\nlevel = \"{}\"\n# dir = \"/absolute/path/to/logs\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_API_TIMEOUT,
            DEFAULT_SUDO_LETTERS,
            DEFAULT_RESPONSIVE_BREAKPOINT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn validate_sudo_alphabet(letters: &str) -> Result<()> {
    if letters.is_empty() {
        bail!("sudo letters must not be empty");
    }
    let mut seen = Vec::new();
    for letter in letters.chars() {
        if !letter.is_alphabetic() {
            bail!("sudo letters must be alphabetic, found {letter:?}");
        }
        if seen.contains(&letter) {
            bail!("sudo letter {letter:?} appears twice; each letter needs its own digit");
        }
        seen.push(letter);
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("STOREDESK_API_URL");
        }
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.api_base_url(), "http://localhost:8080/api");
        assert_eq!(config.api_timeout()?, Duration::from_secs(10));
        assert_eq!(config.sudo_letters(), "abcdefghij");
        assert_eq!(config.responsive_breakpoint(), 100);
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://shop.local/api\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        assert!(error.to_string().contains("version = 1"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 3\n")?;
        let error = Config::load(&path).expect_err("v3 config should fail");
        assert!(error.to_string().contains("unsupported config version 3"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://shop.example/api///\"\ntimeout = \"1500ms\"\n[invoice]\nsudo_letters = \"pqrstuvwxy\"\ndefault_inbound_tax_percent = 18\n[ui]\nresponsive_breakpoint = 90\n[log]\nlevel = \"debug\"\ndir = \"/var/log/storedesk\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.api_base_url(), "https://shop.example/api");
        assert_eq!(config.api_timeout()?, Duration::from_millis(1500));
        assert_eq!(config.sudo_letters(), "pqrstuvwxy");
        assert_eq!(config.default_inbound_tax_percent(), 18.0);
        assert_eq!(config.responsive_breakpoint(), 90);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_dir()?, PathBuf::from("/var/log/storedesk"));
        Ok(())
    }

    #[test]
    fn api_url_env_fills_only_an_unset_value() -> Result<()> {
        let _guard = env_lock();
        let (_temp, unset) = write_config("version = 1\n")?;
        let (_temp2, explicit) =
            write_config("version = 1\n[api]\nbase_url = \"http://from-file/api\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("STOREDESK_API_URL", "http://from-env/api/");
        }
        let from_env = Config::load(&unset)?.api_base_url();
        let from_file = Config::load(&explicit)?.api_base_url();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("STOREDESK_API_URL");
        }
        assert_eq!(from_env, "http://from-env/api");
        assert_eq!(from_file, "http://from-file/api");
        Ok(())
    }

    #[test]
    fn non_http_base_url_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://shop/api\"\n")?;
        let error = Config::load(&path).expect_err("ftp should fail");
        assert!(error.to_string().contains("http or https"));
        Ok(())
    }

    #[test]
    fn sudo_letters_must_be_unique_and_alphabetic() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[invoice]\nsudo_letters = \"abca\"\n")?;
        let error = Config::load(&path).expect_err("duplicate letter should fail");
        assert!(format!("{error:#}").contains("appears twice"));

        let (_temp, path) = write_config("version = 1\n[invoice]\nsudo_letters = \"ab1\"\n")?;
        let error = Config::load(&path).expect_err("digit should fail");
        assert!(format!("{error:#}").contains("alphabetic"));
        Ok(())
    }

    #[test]
    fn negative_tax_and_zero_breakpoint_are_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[invoice]\ndefault_inbound_tax_percent = -5\n")?;
        let error = Config::load(&path).expect_err("negative tax should fail");
        assert!(error.to_string().contains("must be non-negative"));

        let (_temp, path) = write_config("version = 1\n[ui]\nresponsive_breakpoint = 0\n")?;
        let error = Config::load(&path).expect_err("zero breakpoint should fail");
        assert!(error.to_string().contains("positive column count"));
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("STOREDESK_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("STOREDESK_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        for section in ["[api]", "[invoice]", "[ui]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.sudo_letters(), "abcdefghij");
        Ok(())
    }
}
