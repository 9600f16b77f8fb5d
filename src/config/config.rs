use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

const CONFIG_FILE_NAME: &str = "mirror.yaml";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Settings read from the optional YAML config file. Unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorConfig {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl MirrorConfig {
    /// Reads `explicit` if given, otherwise `mirror.yaml` in `root` when it exists.
    pub async fn read(explicit: Option<&Path>, root: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path.to_path_buf()).await,
            None => {
                let path = get_config_file_path(root);
                if path.is_file() {
                    Self::from_path(path).await
                } else {
                    debug!(
                        "No config file at {}, using defaults",
                        path.best_effort_path_display()
                    );
                    Ok(Self::default())
                }
            }
        }
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ConfigError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = compio::fs::read(&path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8 {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read config file: {} bytes", contents.len());

        contents.as_str().try_into()
    }

    fn apply(&mut self, key: &str, value: &Yaml) -> Result<(), ConfigError> {
        match key {
            "source" => self.source = Some(Self::path_value(key, value)?),
            "replica" => self.replica = Some(Self::path_value(key, value)?),
            "log_file" => self.log_file = Some(Self::path_value(key, value)?),
            "interval" => match value {
                Yaml::Value(Scalar::Integer(seconds)) if *seconds > 0 => {
                    self.interval = Some(*seconds as u64)
                }
                _ => {
                    return InvalidValueSnafu {
                        key,
                        expected: "a positive number of seconds",
                    }
                    .fail();
                }
            },
            _ => debug!("Ignoring unknown config key '{}'", key),
        }
        Ok(())
    }

    fn path_value(key: &str, value: &Yaml) -> Result<PathBuf, ConfigError> {
        value
            .as_str()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .context(InvalidValueSnafu {
                key,
                expected: "a non-empty path",
            })
    }

    fn from_mapping(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, ConfigError> {
        top_level
            .iter()
            .filter_map(|(key, value)| {
                if let Yaml::Value(Scalar::String(name)) = key {
                    return Some((name, value));
                }
                debug!("Skipping non-string config key: {:?}", key);
                None
            })
            .try_fold(Self::default(), |mut config, (key, value)| {
                config.apply(key, value)?;
                Ok(config)
            })
    }
}

impl TryFrom<&str> for MirrorConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| ConfigError::ParseError { source: e })?;

        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Self::default());
        }

        let top_level = document.as_mapping().ok_or(ConfigError::TopLevelNotMap)?;
        Self::from_mapping(top_level)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    NotUtf8 { file_path: String },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue { key: String, expected: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn config_returns_error_on_nonexistent_explicit_file() {
        let result = MirrorConfig::read(Some(Path::new("nonexistent.yaml")), Path::new(".")).await;
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[compio::test]
    async fn config_defaults_when_implicit_file_is_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = MirrorConfig::read(None, temp_dir.path()).await;
        assert_eq!(result.unwrap(), MirrorConfig::default());
    }

    #[compio::test]
    async fn config_reads_implicit_file_from_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(
            temp_dir.path().join("mirror.yaml"),
            "source: ./in\nreplica: ./out\ninterval: 5\nlog_file: sync.log\n",
        )
        .unwrap();

        let config = MirrorConfig::read(None, temp_dir.path()).await.unwrap();

        assert_eq!(
            config,
            MirrorConfig {
                source: Some(PathBuf::from("./in")),
                replica: Some(PathBuf::from("./out")),
                interval: Some(5),
                log_file: Some(PathBuf::from("sync.log")),
            }
        );
    }

    #[test]
    fn config_returns_error_on_invalid_yaml() {
        let result: Result<MirrorConfig, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn config_treats_empty_file_as_defaults() {
        let result: Result<MirrorConfig, _> = "".try_into();
        assert_eq!(result.unwrap(), MirrorConfig::default());
    }

    #[test]
    fn config_returns_error_when_top_level_is_not_map() {
        let result: Result<MirrorConfig, _> = "- item1\n- item2".try_into();
        assert!(matches!(result, Err(ConfigError::TopLevelNotMap)));
    }

    #[test]
    fn config_keeps_unset_keys_empty_and_ignores_unknown_ones() {
        let result: Result<MirrorConfig, _> = "replica: /backup\ncolour: blue".try_into();
        let config = result.unwrap();
        assert_eq!(config.replica, Some(PathBuf::from("/backup")));
        assert_eq!(config.source, None);
        assert_eq!(config.interval, None);
    }

    #[test]
    fn config_rejects_non_positive_interval() {
        for yaml in ["interval: 0", "interval: -3", "interval: soon"] {
            let result: Result<MirrorConfig, _> = yaml.try_into();
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { ref key, .. }) if key == "interval"),
                "expected rejection for {yaml:?}"
            );
        }
    }

    #[test]
    fn config_rejects_non_string_paths() {
        let result: Result<MirrorConfig, _> = "source: [a, b]".try_into();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "source"
        ));
    }
}
