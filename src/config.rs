use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::thread;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_ENV: &str = "BURROW_CONFIG";
pub const ENV_PREFIX: &str = "BURROW_";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Entries that mark a project root when searching upward from the
    /// working directory.
    pub root_markers: Vec<String>,
    /// Crawler threads. Defaults to the available parallelism.
    pub workers: Option<usize>,
    /// Show captured log output at the bottom of the screen.
    pub debug: bool,
    /// Log filter directive used when `BURROW_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_markers: vec![".git".to_string()],
            workers: None,
            debug: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then every config file that exists, then `BURROW_*` vars.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        for path in config_paths(extra) {
            if path.is_file() {
                figment = figment.merge(Toml::file(&path));
            }
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log", "config"]));

        let mut config = Self::from_figment(&figment)?;
        if env_flag("DEBUG") {
            config.debug = true;
        }
        Ok(config)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(4)
    }

    pub fn schema_json() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

fn env_flag(name: &str) -> bool {
    env::var_os(name).is_some_and(|value| !value.is_empty())
}

fn config_paths(extra: Option<&Path>) -> Vec<PathBuf> {
    let home = env::var_os("HOME").map(PathBuf::from);
    let mut paths = vec![PathBuf::from("/etc/burrow/config.toml")];
    let xdg = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home.as_ref().map(|home| home.join(".config")));
    if let Some(xdg) = xdg {
        paths.push(xdg.join("burrow/config.toml"));
    }
    if let Some(home) = &home {
        paths.push(home.join(".config/burrow/config.toml"));
        paths.push(home.join(".burrow.toml"));
    }
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|path| !path.is_empty()) {
        paths.push(PathBuf::from(path));
    }
    if let Some(path) = extra {
        paths.push(path.to_path_buf());
    }

    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.root_markers, vec![".git"]);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(
            r#"
            root_markers = [".hg", "Cargo.toml"]
            workers = 2
            debug = true
            "#,
        ));
        let config = Config::from_figment(&figment).unwrap();
        assert_eq!(config.root_markers, vec![".hg", "Cargo.toml"]);
        assert_eq!(config.worker_count(), 2);
        assert!(config.debug);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn zero_workers_falls_back() {
        let config = Config {
            workers: Some(0),
            ..Config::default()
        };
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn bad_types_are_reported() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("workers = \"many\""));
        assert!(Config::from_figment(&figment).is_err());
    }

    #[test]
    fn extra_path_is_last() {
        let paths = config_paths(Some(Path::new("/tmp/extra.toml")));
        assert_eq!(paths.last(), Some(&PathBuf::from("/tmp/extra.toml")));
        assert_eq!(paths[0], PathBuf::from("/etc/burrow/config.toml"));
    }

    #[test]
    fn schema_names_every_key() {
        let schema = Config::schema_json().unwrap();
        for key in ["root_markers", "workers", "debug", "log_filter"] {
            assert!(schema.contains(key), "{key} missing from {schema}");
        }
    }
}
