//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use download_provider::network::NetworkType;

/// Values read from `config.toml`; every key is optional.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Database file used when `--db` is not given.
    pub db_path: Option<PathBuf>,
    pub verbosity: Option<VerbositySetting>,
    /// Pool size (1..=20).
    pub db_max_connections: Option<u32>,
    /// `SQLite` busy timeout in milliseconds (0..=120000).
    pub db_busy_timeout_ms: Option<u32>,
    /// Backoff base (1..=3600).
    pub retry_base_delay_secs: Option<u32>,
    pub label_queued: Option<String>,
    pub label_running: Option<String>,
    pub label_error: Option<String>,
    pub root_title: Option<String>,
    pub network_available: Option<bool>,
    pub network_roaming: Option<bool>,
    pub network_type: Option<NetworkType>,
}

impl FileConfig {
    /// Checks ranges that the parser alone does not enforce.
    pub fn validate(&self) -> Result<()> {
        if let Some(value) = self.db_max_connections
            && !(1..=20).contains(&value)
        {
            bail!("Invalid config value for `db_max_connections`: {value}. Expected range: 1..=20");
        }
        if let Some(value) = self.db_busy_timeout_ms
            && value > 120_000
        {
            bail!(
                "Invalid config value for `db_busy_timeout_ms`: {value}. Expected range: 0..=120000"
            );
        }
        if let Some(value) = self.retry_base_delay_secs
            && !(1..=3600).contains(&value)
        {
            bail!(
                "Invalid config value for `retry_base_delay_secs`: {value}. Expected range: 1..=3600"
            );
        }
        for (key, label) in [
            ("label_queued", &self.label_queued),
            ("label_running", &self.label_running),
            ("label_error", &self.label_error),
            ("root_title", &self.root_title),
        ] {
            if label.as_deref().is_some_and(|value| value.trim().is_empty()) {
                bail!("Invalid config value for `{key}`: must not be empty");
            }
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/download-provider/config.toml`
/// 2. `$HOME/.config/download-provider/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("download-provider")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("download-provider")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the default config file, or an empty config when there is none.
pub fn load_default_file_config() -> Result<FileConfig> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

/// Loads and validates one config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "db_path" => {
                cfg.db_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(invalid)?);
            }
            "db_max_connections" => {
                cfg.db_max_connections = Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "db_busy_timeout_ms" => {
                cfg.db_busy_timeout_ms = Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "retry_base_delay_secs" => {
                cfg.retry_base_delay_secs =
                    Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "label_queued" => {
                cfg.label_queued = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "label_running" => {
                cfg.label_running = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "label_error" => {
                cfg.label_error = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "root_title" => {
                cfg.root_title = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "network_available" => {
                cfg.network_available = Some(parse_boolean(value).with_context(invalid)?);
            }
            "network_roaming" => {
                cfg.network_roaming = Some(parse_boolean(value).with_context(invalid)?);
            }
            "network_type" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let network_type = parsed
                    .parse::<NetworkType>()
                    .map_err(anyhow::Error::msg)
                    .with_context(invalid)?;
                cfg.network_type = Some(network_type);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
retry_base_delay_secs = 60
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.retry_base_delay_secs, Some(60));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.db_path.is_none());
    }

    #[test]
    fn test_parse_config_labels_and_root_title() {
        let cfg = parse_config_str(
            r#"
label_queued = "En attente"
label_running = "En cours" # French
label_error = "Erreur"
root_title = "Téléchargements"
"#,
        )
        .expect("labels should parse");
        assert_eq!(cfg.label_queued.as_deref(), Some("En attente"));
        assert_eq!(cfg.label_running.as_deref(), Some("En cours"));
        assert_eq!(cfg.label_error.as_deref(), Some("Erreur"));
        assert_eq!(cfg.root_title.as_deref(), Some("Téléchargements"));
    }

    #[test]
    fn test_parse_config_rejects_empty_label() {
        let err = parse_config_str(r#"label_error = "  ""#).expect_err("empty label rejected");
        assert!(err.to_string().contains("label_error"));
    }

    #[test]
    fn test_parse_config_network_facts() {
        let cfg = parse_config_str(
            r#"
network_available = true
network_roaming = true
network_type = "mobile"
"#,
        )
        .expect("network config should parse");
        assert_eq!(cfg.network_available, Some(true));
        assert_eq!(cfg.network_roaming, Some(true));
        assert_eq!(cfg.network_type, Some(NetworkType::Mobile));
    }

    #[test]
    fn test_parse_config_rejects_unknown_network_type() {
        let err = parse_config_str(r#"network_type = "satellite""#).expect_err("bad type");
        assert!(err.to_string().contains("network_type"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("network_roaming = yes").expect_err("invalid boolean expected");
        assert!(err.to_string().contains("network_roaming"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_config_rejects_base_delay_out_of_range() {
        let err = parse_config_str("retry_base_delay_secs = 0").expect_err("0 is below range");
        assert!(err.to_string().contains("retry_base_delay_secs"));
        let err = parse_config_str("retry_base_delay_secs = 3601").expect_err("above range");
        assert!(err.to_string().contains("retry_base_delay_secs"));
    }

    #[test]
    fn test_parse_config_db_options() {
        let cfg = parse_config_str(
            r#"
db_path = "/var/lib/download-provider/downloads.db"
db_max_connections = 10
db_busy_timeout_ms = 3000
"#,
        )
        .expect("db options should parse");
        assert_eq!(
            cfg.db_path,
            Some(PathBuf::from("/var/lib/download-provider/downloads.db"))
        );
        assert_eq!(cfg.db_max_connections, Some(10));
        assert_eq!(cfg.db_busy_timeout_ms, Some(3000));
    }

    #[test]
    fn test_parse_config_rejects_invalid_db_busy_timeout_ms() {
        let err = parse_config_str("db_busy_timeout_ms = 120001")
            .expect_err("value above 120000 should be rejected");
        assert!(err.to_string().contains("db_busy_timeout_ms"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("\n\ndb_max_connections = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(err.to_string().contains("db_max_connections"));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("db_path").expect_err("syntax error expected");
        assert!(err.to_string().contains("expected key = value"));
    }
}
