use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::AulaConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["aula.toml", "aula.yaml", "aula.yml", "aula.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<AulaConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the config file as a generic value tree (after env substitution).
pub fn load_config_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./aula.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/aula/aula.{toml,yaml,yml,json}` (user-global)
///
/// Returns `AulaConfig::default()` if no config file is found.
pub fn discover_and_load() -> AulaConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    AulaConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/aula/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "aula").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory (`~/.local/share/aula/`), or `./.aula` when no
/// home directory can be resolved.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "aula")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".aula"))
}

/// Where the JSON store lives for this config.
pub fn storage_path(config: &AulaConfig) -> PathBuf {
    config
        .storage
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("aula.json"))
}

/// Where exported reports are written for this config.
pub fn reports_dir(config: &AulaConfig) -> PathBuf {
    config
        .reports
        .dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("reports"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<AulaConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("aula.toml");
        std::fs::write(&toml_path, "[bot]\nprefix = \"!\"\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().bot.prefix, '!');

        let yaml_path = dir.path().join("aula.yaml");
        std::fs::write(&yaml_path, "class:\n  name: Redes\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().class.name, "Redes");

        let json_path = dir.path().join("aula.json");
        std::fs::write(&json_path, r#"{"bot":{"maintenance":true}}"#).unwrap();
        assert!(load_config(&json_path).unwrap().bot.maintenance);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aula.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_paths_win_over_data_dir() {
        let mut cfg = AulaConfig::default();
        cfg.storage.path = Some("/tmp/aula-store.json".into());
        cfg.reports.dir = Some("/tmp/aula-reports".into());
        assert_eq!(storage_path(&cfg), PathBuf::from("/tmp/aula-store.json"));
        assert_eq!(reports_dir(&cfg), PathBuf::from("/tmp/aula-reports"));
    }
}
