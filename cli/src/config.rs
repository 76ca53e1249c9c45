use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database location. An explicit path (from `--db` or
    /// `LARDER_DB`) wins over the platform data directory.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        if let Some(db_path) = db_override {
            return Self::at(db_path);
        }

        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;
        Self::in_data_dir(proj_dirs.data_dir())
    }

    fn in_data_dir(data_dir: &Path) -> Result<Self> {
        Self::at(data_dir.join("larder.db"))
    }

    fn at(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("nested").join("larder");
        let config = Config::in_data_dir(&data_dir).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(config.db_path, data_dir.join("larder.db"));
    }

    #[test]
    fn test_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("elsewhere").join("kitchen.db");
        let config = Config::load(Some(path.clone())).unwrap();
        assert_eq!(config.db_path, path);
        assert!(tmp.path().join("elsewhere").is_dir());
    }

    #[test]
    fn test_override_relative_file() {
        let config = Config::load(Some(PathBuf::from("larder.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("larder.db"));
    }
}
