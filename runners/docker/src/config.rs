use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DOCKER_EXECUTABLE: &str = "STYX_DOCKER_EXECUTABLE";
pub const ENV_DATA_DIR: &str = "STYX_DATA_DIR";
pub const ENV_DOCKER_USER_ID: &str = "STYX_DOCKER_USER_ID";
pub const ENV_IMAGE_OVERRIDES: &str = "STYX_IMAGE_OVERRIDES";
pub const ENV_DOCKER_ENV: &str = "STYX_DOCKER_ENV";

/// Settings for a [`crate::DockerRunner`].
///
/// In YAML, an absent `dockerUserId` keeps the host default while an explicit
/// `null` runs as the image's own user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DockerRunnerConfig {
    pub docker_executable: String,
    pub data_dir: PathBuf,
    pub docker_user_id: Option<u32>,
    pub image_overrides: HashMap<String, String>,
    pub environ: BTreeMap<String, String>,
}

impl Default for DockerRunnerConfig {
    fn default() -> Self {
        Self {
            docker_executable: "docker".to_string(),
            data_dir: PathBuf::from("styx_tmp"),
            docker_user_id: default_user_id(),
            image_overrides: HashMap::new(),
            environ: BTreeMap::new(),
        }
    }
}

/// Effective uid of this process; containers then write output files the
/// caller owns.
#[cfg(unix)]
pub fn default_user_id() -> Option<u32> {
    Some(unsafe { libc::geteuid() })
}

#[cfg(not(unix))]
pub fn default_user_id() -> Option<u32> {
    None
}

impl DockerRunnerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `STYX_*` environment variables on top of `self`.
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    pub fn merge_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(exe) = non_empty(ENV_DOCKER_EXECUTABLE) {
            debug!("Using docker executable from {}: {}", ENV_DOCKER_EXECUTABLE, exe);
            self.docker_executable = exe.trim().to_string();
        }
        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(uid) = non_empty(ENV_DOCKER_USER_ID) {
            self.docker_user_id = parse_user_id(ENV_DOCKER_USER_ID, &uid)?;
        }
        if let Some(raw) = non_empty(ENV_IMAGE_OVERRIDES) {
            let overrides: HashMap<String, String> = parse_json_map(ENV_IMAGE_OVERRIDES, &raw)?;
            self.image_overrides.extend(overrides);
        }
        if let Some(raw) = non_empty(ENV_DOCKER_ENV) {
            let environ: BTreeMap<String, String> = parse_json_map(ENV_DOCKER_ENV, &raw)?;
            self.environ.extend(environ);
        }
        Ok(self)
    }

    pub fn with_docker_executable(mut self, exe: impl Into<String>) -> Self {
        self.docker_executable = exe.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_docker_user_id(mut self, uid: Option<u32>) -> Self {
        self.docker_user_id = uid;
        self
    }

    pub fn with_image_override(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.image_overrides.insert(from.into(), to.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environ.insert(key.into(), value.into());
        self
    }
}

/// `none` (any case) disables the user flag; anything else must be a uid.
pub fn parse_user_id(key: &str, value: &str) -> Result<Option<u32>, ConfigError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{}' is not a numeric user id ({})", value, err),
        })
}

fn parse_json_map<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a JSON object of strings: {}", err),
    })
}
