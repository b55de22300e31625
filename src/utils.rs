use std::path::{Path, PathBuf};

const APP_DIR: &str = "MapFlam";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user directory holding the config file and saved maps
pub fn get_app_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support").join(APP_DIR)
    } else if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    } else if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        PathBuf::from(xdg).join(APP_DIR)
    } else {
        home_dir().join(".local/share").join(APP_DIR)
    }
}

/// Default export target: `~/Downloads` when it exists, else the working directory
pub fn get_download_dir() -> PathBuf {
    let downloads = home_dir().join("Downloads");
    if downloads.is_dir() {
        return downloads;
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Expands a leading `~/` in paths taken from the config file
pub fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => home_dir().join(rest),
        None if raw == "~" => home_dir(),
        None => PathBuf::from(raw),
    }
}

pub fn ensure_directory_exists(path: &Path) -> Result<(), std::io::Error> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("mapflam.ini")
}

/// Temp file that is deleted on drop unless `keep` is called.
/// Covers every early return between writing it and renaming it into place.
pub struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PartialFile {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call once the file has been renamed to its final name
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_home("/tmp/maps"), PathBuf::from("/tmp/maps"));
        assert_eq!(expand_home("maps/~old"), PathBuf::from("maps/~old"));
    }

    #[test]
    fn tilde_resolves_under_home() {
        let expanded = expand_home("~/maps");
        assert!(expanded.ends_with("maps"));
        assert_ne!(expanded, PathBuf::from("~/maps"));
    }

    #[test]
    fn partial_file_is_removed_unless_kept() {
        let dir = std::env::temp_dir().join(format!("mapflam-partial-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let abandoned = PartialFile::new(dir.join("a.part"));
        std::fs::write(abandoned.path(), b"half").unwrap();
        drop(abandoned);
        assert!(!dir.join("a.part").exists());

        let kept = PartialFile::new(dir.join("b.part"));
        std::fs::write(kept.path(), b"done").unwrap();
        std::fs::rename(kept.path(), dir.join("b")).unwrap();
        kept.keep();
        assert!(dir.join("b").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn config_lives_in_app_dir() {
        let path = get_config_path();
        assert_eq!(path.file_name().unwrap(), "mapflam.ini");
        assert!(path.parent().unwrap().ends_with(APP_DIR));
    }
}
