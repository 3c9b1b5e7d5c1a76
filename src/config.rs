use std::path::PathBuf;

use crate::store::STORAGE_KEY;

pub const DB_ENV: &str = "APPTRACK_DB";
pub const STORAGE_KEY_ENV: &str = "APPTRACK_STORAGE_KEY";

/// Runtime settings, resolved from CLI flags, then environment, then platform defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub storage_key: String,
    pub log_level: &'static str,
}

impl Config {
    pub fn load(db_override: Option<PathBuf>, verbose: u8, quiet: bool) -> Self {
        Self::resolve(
            db_override,
            std::env::var(DB_ENV).ok(),
            std::env::var(STORAGE_KEY_ENV).ok(),
            verbose,
            quiet,
        )
    }

    fn resolve(
        db_override: Option<PathBuf>,
        db_env: Option<String>,
        key_env: Option<String>,
        verbose: u8,
        quiet: bool,
    ) -> Self {
        let db_path = db_override
            .or_else(|| db_env.filter(|p| !p.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(default_db_path);

        let storage_key = key_env
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| STORAGE_KEY.to_string());

        Self {
            db_path,
            storage_key,
            log_level: log_level(verbose, quiet),
        }
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
        proj_dirs.data_dir().join("apptrack.db")
    } else {
        PathBuf::from("apptrack.db")
    }
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_beats_environment() {
        let config = Config::resolve(
            Some(PathBuf::from("/tmp/flag.db")),
            Some("/tmp/env.db".to_string()),
            None,
            0,
            false,
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/flag.db"));
    }

    #[test]
    fn test_environment_beats_default() {
        let config = Config::resolve(None, Some("/tmp/env.db".to_string()), None, 0, false);
        assert_eq!(config.db_path, PathBuf::from("/tmp/env.db"));
    }

    #[test]
    fn test_default_path_and_key() {
        let config = Config::resolve(None, Some("  ".to_string()), Some(String::new()), 0, false);
        assert!(config.db_path.ends_with("apptrack.db"));
        assert_eq!(config.storage_key, "jobApplications");
    }

    #[test]
    fn test_storage_key_from_environment() {
        let config = Config::resolve(None, None, Some("sandbox".to_string()), 0, false);
        assert_eq!(config.storage_key, "sandbox");
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0, false), "warn");
        assert_eq!(log_level(1, false), "info");
        assert_eq!(log_level(2, false), "debug");
        assert_eq!(log_level(5, false), "trace");
        assert_eq!(log_level(3, true), "error");
    }
}
