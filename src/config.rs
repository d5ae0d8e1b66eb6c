use crate::aggregate::{AggregateOptions, IngredientOrder, Profile, defaults};
use crate::catalog::{CatalogError, Vocabulary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the configured confidence threshold.
pub const CONFIDENCE_ENV: &str = "PANTRYSENSE_CONFIDENCE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),
    #[error("PANTRYSENSE_CONFIDENCE={0:?} is not a number")]
    InvalidThresholdOverride(String),
    #[error("confidence precision {0} is more decimals than supported")]
    InvalidPrecision(u32),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PantryConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

/// Frame aggregation settings. Unset fields fall back to the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_order: Option<IngredientOrder>,
    pub normalized_boxes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Vocabulary TOML file replacing the embedded pantry catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            confidence_threshold: None,
            confidence_precision: None,
            ingredient_order: None,
            normalized_boxes: true,
        }
    }
}

impl DetectionConfig {
    /// Resolve the effective options: profile defaults, then file settings.
    pub fn options(&self) -> Result<AggregateOptions, ConfigError> {
        let mut options = self.profile.options();
        if let Some(threshold) = self.confidence_threshold {
            options = options.with_threshold(threshold);
        }
        if let Some(precision) = self.confidence_precision {
            options = options.with_precision(precision);
        }
        if let Some(order) = self.ingredient_order {
            options = options.with_order(order);
        }
        options = options.with_normalized_boxes(self.normalized_boxes);

        if !(0.0..=1.0).contains(&options.confidence_threshold) {
            return Err(ConfigError::InvalidThreshold(options.confidence_threshold));
        }
        if options.confidence_precision > defaults::MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(options.confidence_precision));
        }
        Ok(options)
    }
}

impl PantryConfig {
    /// Load the user config file if present, otherwise defaults, then apply
    /// the environment override.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env_override()?;
        Ok(config)
    }

    /// Load an explicitly named config file; it must exist and parse.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_override()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_override(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(CONFIDENCE_ENV) {
            let threshold = raw
                .trim()
                .parse::<f32>()
                .map_err(|_| ConfigError::InvalidThresholdOverride(raw.clone()))?;
            log::debug!("{} overrides confidence threshold with {}", CONFIDENCE_ENV, threshold);
            self.detection.confidence_threshold = Some(threshold);
        }
        Ok(())
    }

    /// The configured vocabulary file, or the embedded pantry.
    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        let vocabulary = match &self.vocabulary.path {
            Some(path) => Vocabulary::load(path)?,
            None => Vocabulary::pantry()?,
        };
        Ok(vocabulary)
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(config_path) = Self::config_file_path() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(config_path, content)?;
        }
        Ok(())
    }

    pub fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|mut path| {
            path.push("config.toml");
            path
        })
    }

    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("pantrysense");
            path
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PantryConfig::default();
        assert_eq!(config.detection.profile, Profile::Pantry);
        assert!(config.detection.normalized_boxes);
        assert!(config.vocabulary.path.is_none());

        let options = config.detection.options().unwrap();
        assert_eq!(options, Profile::Pantry.options());
    }

    #[test]
    fn test_config_serialization() {
        let config = PantryConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[detection]"));
        assert!(toml_str.contains("profile = \"pantry\""));
        assert!(toml_str.contains("normalized_boxes = true"));
        assert!(!toml_str.contains("confidence_threshold"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[detection]
profile = "legacy"
confidence_threshold = 0.5
confidence_precision = 3
ingredient_order = "sorted"
normalized_boxes = false

[vocabulary]
path = "/etc/pantrysense/vocabulary.toml"
"#;

        let config: PantryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.detection.profile, Profile::Legacy);
        assert_eq!(
            config.vocabulary.path.as_deref(),
            Some(Path::new("/etc/pantrysense/vocabulary.toml"))
        );

        let options = config.detection.options().unwrap();
        assert_eq!(options.confidence_threshold, 0.5);
        assert_eq!(options.confidence_precision, 3);
        assert_eq!(options.ingredient_order, IngredientOrder::Sorted);
        assert!(!options.normalized_boxes);
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
[detection]
profile = "legacy"
"#;

        let config: PantryConfig = toml::from_str(toml_str).unwrap();
        let options = config.detection.options().unwrap();
        assert_eq!(options, Profile::Legacy.options());
        assert!(config.vocabulary.path.is_none());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config: PantryConfig = toml::from_str("[detection]\nconfidence_threshold = 1.5").unwrap();
        assert!(matches!(
            config.detection.options(),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_invalid_precision_rejected() {
        let config: PantryConfig = toml::from_str("[detection]\nconfidence_precision = 9").unwrap();
        assert!(matches!(
            config.detection.options(),
            Err(ConfigError::InvalidPrecision(9))
        ));
    }

    #[test]
    #[serial]
    fn test_env_override_threshold() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detection]\nconfidence_threshold = 0.3").unwrap();

        temp_env::with_var(CONFIDENCE_ENV, Some("0.6"), || {
            let config = PantryConfig::load_from(file.path()).unwrap();
            assert_eq!(config.detection.confidence_threshold, Some(0.6));
        });
        temp_env::with_var_unset(CONFIDENCE_ENV, || {
            let config = PantryConfig::load_from(file.path()).unwrap();
            assert_eq!(config.detection.confidence_threshold, Some(0.3));
        });
    }

    #[test]
    #[serial]
    fn test_env_override_must_be_numeric() {
        let file = tempfile::NamedTempFile::new().unwrap();
        temp_env::with_var(CONFIDENCE_ENV, Some("high"), || {
            let err = PantryConfig::load_from(file.path()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidThresholdOverride(ref v) if v == "high"));
        });
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PantryConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_vocabulary_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "items = [\"Pea\", \"Pea Soup\"]").unwrap();

        let config = PantryConfig {
            vocabulary: VocabularyConfig {
                path: Some(file.path().to_path_buf()),
            },
            ..Default::default()
        };
        let vocabulary = config.vocabulary().unwrap();
        assert_eq!(vocabulary.catalog.len(), 2);
    }
}
