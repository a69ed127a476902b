//! Layered configuration loading.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientConfig;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "REMORA_";

/// Load from `file` (if any) and the process environment, then validate.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an override is
/// malformed, or the result fails validation.
pub fn load(file: Option<&Path>) -> ConfigResult<ClientConfig> {
    load_with(file, |name| std::env::var(name).ok())
}

/// Like [`load`], reading overrides through `env` instead of the process
/// environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(file: Option<&Path>, env: F) -> ConfigResult<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match file {
        Some(path) => read_file(path)?,
        None => ClientConfig::default(),
    };
    apply_env(&mut config, &env)?;
    config.validate()?;
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<ClientConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    if raw.trim().is_empty() {
        return Ok(ClientConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(config: &mut ClientConfig, env: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        let name = format!("{ENV_PREFIX}{suffix}");
        env(&name).map(|value| (name, value))
    };

    if let Some((_, host)) = var("HOST") {
        config.host = host;
    }
    if let Some((name, port)) = var("PORT") {
        config.port = parse(&name, &port)?;
    }
    if let Some((_, path)) = var("RPC_PATH") {
        config.path = path;
    }
    if let Some((_, username)) = var("USERNAME") {
        config.username = Some(username);
    }
    if let Some((_, password)) = var("PASSWORD") {
        config.password = Some(password);
    }
    if let Some((name, secs)) = var("POLL_INTERVAL_SECS") {
        config.poll_interval_secs = parse(&name, &secs)?;
    }
    if let Some((name, secs)) = var("TIMEOUT_SECS") {
        config.request_timeout_secs = parse(&name, &secs)?;
    }
    Ok(())
}

fn parse<T: FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write as _;

    use anyhow::Result;
    use tempfile::NamedTempFile;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn yaml(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn defaults_without_file_or_env() -> Result<()> {
        let config = load_with(None, env(&[]))?;
        assert_eq!(config, ClientConfig::default());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let file = yaml("host: nas.local\nport: 9092\nusername: admin\npassword: secret\n")?;
        let config = load_with(Some(file.path()), env(&[]))?;
        assert_eq!(config.host, "nas.local");
        assert_eq!(config.port, 9092);
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.poll_interval_secs, 5);
        Ok(())
    }

    #[test]
    fn env_overrides_file() -> Result<()> {
        let file = yaml("host: nas.local\npoll_interval_secs: 30\n")?;
        let config = load_with(
            Some(file.path()),
            env(&[
                ("REMORA_HOST", "10.0.0.5"),
                ("REMORA_POLL_INTERVAL_SECS", "2"),
                ("REMORA_RPC_PATH", "/rpc"),
            ]),
        )?;
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.path, "/rpc");
        Ok(())
    }

    #[test]
    fn empty_file_means_defaults() -> Result<()> {
        let file = yaml("  \n")?;
        assert_eq!(load_with(Some(file.path()), env(&[]))?, ClientConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_override_is_reported() {
        let err = load_with(None, env(&[("REMORA_PORT", "ninety")])).expect_err("bad port");
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { ref name, ref value } if name == "REMORA_PORT" && value == "ninety"
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() -> Result<()> {
        let file = yaml("hots: typo.local\n")?;
        let err = load_with(Some(file.path()), env(&[])).expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_with(Some(Path::new("/definitely/missing/remora.yaml")), env(&[]))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn loaded_config_is_validated() {
        let err = load_with(None, env(&[("REMORA_PASSWORD", "secret")])).expect_err("no user");
        assert!(matches!(err, ConfigError::InvalidField { field: "password", .. }));
    }
}
