//! Loading the lesson catalog (subjects, lesson tables, step content) from TOML.
//!
//! The built-in catalog is compiled in from `content/catalog.toml`. Setting
//! CONTENT_CONFIG_PATH replaces it with another file using the same schema.
//! See `ContentConfig` for the expected layout.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{LessonDescriptor, StepDescriptor};

const EMBEDDED_CATALOG: &str = include_str!("../content/catalog.toml");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentConfig {
  #[serde(default)]
  pub subjects: Vec<SubjectCfg>,
  #[serde(default)]
  pub lesson_content: Vec<LessonContentCfg>,
}

/// Subject entry. `lessons` is left out for subjects without an authored table.
#[derive(Clone, Debug, Deserialize)]
pub struct SubjectCfg {
  pub id: String,
  pub name: String,
  #[serde(default)] pub icon: String,
  #[serde(default)] pub lessons: Option<Vec<LessonDescriptor>>,
}

/// Authored steps for one (subject, lesson) pair.
#[derive(Clone, Debug, Deserialize)]
pub struct LessonContentCfg {
  pub subject: String,
  pub lesson: u32,
  pub title: String,
  #[serde(default)]
  pub steps: Vec<StepDescriptor>,
}

impl ContentConfig {
  /// Parse the catalog that ships with the binary.
  pub fn embedded() -> Result<Self, toml::de::Error> {
    toml::from_str(EMBEDDED_CATALOG)
  }

  pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(s)
  }
}

/// Load from CONTENT_CONFIG_PATH if set. On any IO/parse error of that file
/// the embedded catalog is used instead.
pub fn load_content_config_from_env() -> Result<ContentConfig, toml::de::Error> {
  load_content_config(std::env::var("CONTENT_CONFIG_PATH").ok().as_deref())
}

/// Load the catalog at `path`, or the embedded one when `path` is `None` or unusable.
pub fn load_content_config(path: Option<&str>) -> Result<ContentConfig, toml::de::Error> {
  let Some(path) = path else {
    return ContentConfig::embedded();
  };
  match std::fs::read_to_string(path) {
    Ok(s) => match ContentConfig::from_toml(&s) {
      Ok(cfg) => {
        info!(target: "starsteps", %path, subjects = cfg.subjects.len(), "Loaded content catalog (TOML)");
        Ok(cfg)
      }
      Err(e) => {
        error!(target: "starsteps", %path, error = %e, "Failed to parse content TOML; using built-in catalog");
        ContentConfig::embedded()
      }
    },
    Err(e) => {
      error!(target: "starsteps", %path, error = %e, "Failed to read content TOML; using built-in catalog");
      ContentConfig::embedded()
    }
  }
}
