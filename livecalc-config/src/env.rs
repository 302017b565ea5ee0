//! Environment variable overrides for daemon settings.
//!
//! Loading hierarchy: env > file > defaults.

use crate::{ConfigError, DaemonSettings};

/// Apply `LIVECALC_*` environment variables on top of a loaded settings
/// struct. Unset variables leave the existing value untouched.
pub fn apply_env_overrides(settings: &mut DaemonSettings) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("LIVECALC_WORKER_THREADS") {
        settings.worker_threads = v
            .parse()
            .map_err(|_| ConfigError::InvalidEnvValue("LIVECALC_WORKER_THREADS".into(), v))?;
    }
    if let Ok(v) = std::env::var("LIVECALC_DEFAULT_TIMEOUT_MS") {
        settings.default_timeout_ms = v
            .parse()
            .map_err(|_| ConfigError::InvalidEnvValue("LIVECALC_DEFAULT_TIMEOUT_MS".into(), v))?;
    }
    if let Ok(v) = std::env::var("LIVECALC_ZERO_MEMORY_BETWEEN_RUNS") {
        settings.zero_memory_between_runs = parse_bool(&v).ok_or_else(|| {
            ConfigError::InvalidEnvValue("LIVECALC_ZERO_MEMORY_BETWEEN_RUNS".into(), v.clone())
        })?;
    }
    if let Ok(v) = std::env::var("LIVECALC_ENABLE_INTEGRITY_CHECKS") {
        settings.enable_integrity_checks = parse_bool(&v).ok_or_else(|| {
            ConfigError::InvalidEnvValue("LIVECALC_ENABLE_INTEGRITY_CHECKS".into(), v.clone())
        })?;
    }
    Ok(())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("banana"), None);
    }
}
