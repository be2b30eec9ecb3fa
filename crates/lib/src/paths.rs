//! Directory resolution for pinsh data.
//!
//! Follows the XDG base directory convention on Unix-like systems, with an
//! environment variable override for the store location so tests and CI can
//! run against an isolated store.

use std::path::PathBuf;

use crate::consts::{APP_NAME, ENV_STORE};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").expect("USERPROFILE not set");
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").expect("HOME not set");
  PathBuf::from(home)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  let local_appdata = std::env::var("LOCALAPPDATA").expect("LOCALAPPDATA not set");
  PathBuf::from(local_appdata).join(APP_NAME).join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Returns the store directory.
///
/// The `PINSH_STORE` environment variable takes precedence over the default
/// location under the cache directory.
pub fn store_dir() -> PathBuf {
  if let Ok(path) = std::env::var(ENV_STORE) {
    return PathBuf::from(path);
  }

  default_store_dir()
}

/// Returns the default store directory (ignoring overrides).
pub fn default_store_dir() -> PathBuf {
  cache_dir().join("store")
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn env_var_overrides_store_dir() {
    temp_env::with_var(ENV_STORE, Some("/custom/store"), || {
      assert_eq!(store_dir(), PathBuf::from("/custom/store"));
    });
  }

  #[test]
  #[serial]
  fn store_dir_defaults_under_cache() {
    temp_env::with_vars(
      [
        (ENV_STORE, None::<&str>),
        ("XDG_CACHE_HOME", Some("/custom/cache")),
      ],
      || {
        assert_eq!(store_dir(), PathBuf::from("/custom/cache").join(APP_NAME).join("store"));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [("XDG_CACHE_HOME", None::<&str>), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(cache_dir(), PathBuf::from("/home/user/.cache").join(APP_NAME));
      },
    );
  }
}
