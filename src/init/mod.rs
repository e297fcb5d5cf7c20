//! `shipyard init`: scaffold the project configuration directory.
//!
//! ```text
//! .shipyard/
//! └── shipyard.toml    # Scheduler, tracker, scan and PR gate settings
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, ShipyardToml};

/// The name of the shipyard configuration directory.
pub const SHIPYARD_DIR: &str = ".shipyard";

const CONFIG_HEADER: &str = "# Shipyard configuration. Every key is optional; removed keys fall back\n\
                             # to the defaults shown here.\n\n";

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    pub shipyard_dir: PathBuf,
    /// False if the directory already existed.
    pub created: bool,
    /// Whether a default `shipyard.toml` was written. An existing file is
    /// never overwritten.
    pub config_written: bool,
}

pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let shipyard_dir = get_shipyard_dir(project_dir);
    let created = !shipyard_dir.exists();

    std::fs::create_dir_all(&shipyard_dir)
        .with_context(|| format!("Failed to create directory: {}", shipyard_dir.display()))?;

    let config_path = shipyard_dir.join(CONFIG_FILE);
    let config_written = if config_path.exists() {
        false
    } else {
        write_default_config(&config_path)?;
        true
    };

    Ok(InitResult {
        shipyard_dir,
        created,
        config_written,
    })
}

fn write_default_config(path: &Path) -> Result<()> {
    let body = toml::to_string_pretty(&ShipyardToml::default()).context("Failed to serialize default config")?;
    std::fs::write(path, format!("{}{}", CONFIG_HEADER, body))
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Check if a project is initialized (has a config file).
pub fn is_initialized(project_dir: &Path) -> bool {
    get_shipyard_dir(project_dir).join(CONFIG_FILE).exists()
}

pub fn get_shipyard_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(SHIPYARD_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_project_creates_directory_and_config() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();

        assert!(result.created);
        assert!(result.config_written);
        assert!(result.shipyard_dir.is_dir());
        assert!(is_initialized(dir.path()));
    }

    #[test]
    fn test_default_config_parses_back_to_defaults() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();

        let loaded = ShipyardToml::load_or_default(&get_shipyard_dir(dir.path())).unwrap();
        assert_eq!(loaded, ShipyardToml::default());
    }

    #[test]
    fn test_init_project_keeps_existing_config() {
        let dir = tempdir().unwrap();
        let shipyard_dir = get_shipyard_dir(dir.path());
        std::fs::create_dir_all(&shipyard_dir).unwrap();
        std::fs::write(shipyard_dir.join(CONFIG_FILE), "[pr]\nmax_files = 2\n").unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(!result.config_written);

        let content = std::fs::read_to_string(shipyard_dir.join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "[pr]\nmax_files = 2\n");
    }

    #[test]
    fn test_init_project_existing_empty_directory_writes_config() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(get_shipyard_dir(dir.path())).unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(result.config_written);
    }

    #[test]
    fn test_is_initialized_false_for_new_project() {
        let dir = tempdir().unwrap();
        assert!(!is_initialized(dir.path()));
    }

    #[test]
    fn test_get_shipyard_dir() {
        assert_eq!(
            get_shipyard_dir(Path::new("/tmp/app")),
            PathBuf::from("/tmp/app/.shipyard")
        );
    }
}
