use dirs::home_dir;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

const HOME_ENV: &str = "BOOKKEEPER_HOME";
const DEFAULT_DIR_NAME: &str = ".bookkeeper";
const COMPANIES_DIR: &str = "companies";
const BACKUP_DIR: &str = "backups";
const CONFIG_DIR: &str = "config";
const CONFIG_BACKUP_DIR: &str = "backups";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";

/// Resolves every on-disk location below the application data directory.
pub struct PathResolver;

impl PathResolver {
    /// `$BOOKKEEPER_HOME`, falling back to `~/.bookkeeper`.
    pub fn base_dir() -> PathBuf {
        if let Some(custom) = env::var_os(HOME_ENV) {
            return PathBuf::from(custom);
        }
        home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DIR_NAME)
    }

    pub fn resolve_base(root: Option<PathBuf>) -> PathBuf {
        root.unwrap_or_else(Self::base_dir)
    }

    pub fn company_dir_in(base: &Path) -> PathBuf {
        base.join(COMPANIES_DIR)
    }

    pub fn backup_dir_in(base: &Path) -> PathBuf {
        base.join(BACKUP_DIR)
    }

    pub fn config_dir_in(base: &Path) -> PathBuf {
        base.join(CONFIG_DIR)
    }

    pub fn config_backup_dir_in(base: &Path) -> PathBuf {
        Self::config_dir_in(base).join(CONFIG_BACKUP_DIR)
    }

    pub fn config_file_in(base: &Path) -> PathBuf {
        Self::config_dir_in(base).join(CONFIG_FILE)
    }

    pub fn state_file_in(base: &Path) -> PathBuf {
        base.join(STATE_FILE)
    }
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_hangs_off_the_base() {
        let base = PathBuf::from("/data/books");
        assert_eq!(
            PathResolver::company_dir_in(&base),
            PathBuf::from("/data/books/companies")
        );
        assert_eq!(
            PathResolver::config_file_in(&base),
            PathBuf::from("/data/books/config/config.json")
        );
        assert_eq!(
            PathResolver::config_backup_dir_in(&base),
            PathBuf::from("/data/books/config/backups")
        );
        assert_eq!(
            PathResolver::resolve_base(Some(base.clone())),
            base
        );
    }
}
