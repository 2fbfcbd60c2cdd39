//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Environment variable consulted for the FTP password.
pub const PASSWORD_ENV_VAR: &str = "ASSETSYNC_PASSWORD";

/// TOML-backed file configuration for assetsync defaults.
#[derive(Clone, Default)]
pub struct FileConfig {
    /// FTP server host name.
    pub host: Option<String>,
    /// FTP control port.
    pub port: Option<u16>,
    /// FTP user name.
    pub username: Option<String>,
    /// FTP password. Prefer the environment variable over storing it here.
    pub password: Option<String>,
    /// Remote directory mirrored by pulls.
    pub remote_root: Option<String>,
    /// Local install directory for pulls.
    pub local_root: Option<PathBuf>,
    /// First-install marker file name; an empty string disables the marker.
    pub marker_file: Option<String>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_root", &self.remote_root)
            .field("local_root", &self.local_root)
            .field("marker_file", &self.marker_file)
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(port) = self.port
            && port == 0
        {
            bail!("Invalid config value for `port`: {port}. Expected range: 1..=65535");
        }

        if let Some(host) = &self.host
            && host.trim().is_empty()
        {
            bail!("Invalid config value for `host`: must not be empty");
        }

        if let Some(marker) = &self.marker_file
            && marker.contains(['/', '\\'])
        {
            bail!("Invalid config value for `marker_file`: '{marker}' must be a plain file name");
        }

        Ok(())
    }

    /// Password from the environment, falling back to the config file.
    #[must_use]
    pub fn resolved_password(&self) -> Option<String> {
        env::var(PASSWORD_ENV_VAR)
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| self.password.clone())
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

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    /// The parsed config, or defaults when no file was loaded.
    #[must_use]
    pub fn into_config(self) -> FileConfig {
        self.config.unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/assetsync/config.toml`
/// 2. `$HOME/.config/assetsync/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("assetsync")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("assetsync")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or from the default path if present.
///
/// An explicit path that does not exist is an error; a missing default file
/// is not.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = read_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "host" => cfg.host = Some(string_value(key, value, line_number)?),
            "username" => cfg.username = Some(string_value(key, value, line_number)?),
            "password" => cfg.password = Some(string_value(key, value, line_number)?),
            "remote_root" => cfg.remote_root = Some(string_value(key, value, line_number)?),
            "marker_file" => cfg.marker_file = Some(string_value(key, value, line_number)?),
            "local_root" => {
                cfg.local_root = Some(PathBuf::from(string_value(key, value, line_number)?));
            }
            "port" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `port` value on line {line_number}"))?;
                let port = u16::try_from(parsed).map_err(|_| {
                    anyhow::anyhow!(
                        "Invalid config value for `port`: {parsed} on line {line_number}. Expected range: 1..=65535"
                    )
                })?;
                cfg.port = Some(port);
            }
            "verbosity" => {
                let parsed = string_value(key, value, line_number)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn string_value(key: &str, value: &str, line_number: usize) -> Result<String> {
    parse_string_literal(value)
        .with_context(|| format!("Invalid `{key}` value on line {line_number}"))
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

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_full() {
        let cfg = parse_config_str(
            r#"
host = "ftp.example.com"
port = 2121
username = "launcher"
remote_root = "/mc"
local_root = "/home/player/.game"
marker_file = ".installed"
verbosity = "verbose"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.host.as_deref(), Some("ftp.example.com"));
        assert_eq!(cfg.port, Some(2121));
        assert_eq!(cfg.username.as_deref(), Some("launcher"));
        assert_eq!(cfg.remote_root.as_deref(), Some("/mc"));
        assert_eq!(cfg.local_root, Some(PathBuf::from("/home/player/.game")));
        assert_eq!(cfg.marker_file.as_deref(), Some(".installed"));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(r#"host = "ftp.example.com""#).expect("partial config");
        assert_eq!(cfg.host.as_deref(), Some("ftp.example.com"));
        assert!(cfg.port.is_none());
        assert!(cfg.local_root.is_none());
    }

    #[test]
    fn test_parse_config_rejects_port_zero() {
        let err = parse_config_str("port = 0").expect_err("port 0 is invalid");
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_parse_config_rejects_port_out_of_range() {
        let err = parse_config_str("port = 70000").expect_err("port above u16 is invalid");
        let msg = err.to_string();
        assert!(msg.contains("port"), "Expected key in: {msg}");
        assert!(msg.contains("line 1"), "Expected line number in: {msg}");
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("port = 21 trailing").expect_err("expected trailing token error");
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("host = ftp.example.com").expect_err("strings must be quoted");
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_parse_config_rejects_marker_with_separator() {
        let err = parse_config_str(r#"marker_file = "a/b""#).expect_err("marker must be a name");
        assert!(err.to_string().contains("marker_file"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
port = 21 # control port
remote_root = "/mc#1" # hash inside quotes is kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.port, Some(21));
        assert_eq!(cfg.remote_root.as_deref(), Some("/mc#1"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("\nhost").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = parse_config_str(r#"password = "hunter2""#).expect("password should parse");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let err = load_file_config(Some(&dir.path().join("nope.toml")))
            .expect_err("missing explicit config is an error");
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = 2121\n").expect("write config");

        let loaded = load_file_config(Some(&path)).expect("config should load");
        assert!(loaded.loaded_from_file);
        assert_eq!(loaded.into_config().port, Some(2121));
    }
}
