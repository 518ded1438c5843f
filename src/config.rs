//! 对战配置：评分目录、默认选手名与回合推进策略。
//!
//! 默认值与内置目录一致；也可以从 TOML 载入，例如：
//!
//! ```toml
//! default_names = ["MC 1", "MC 2"]
//! strict_transitions = false
//!
//! [[criteria]]
//! name = "Fatality"
//! points = 3
//!
//! [[criteria]]
//! name = "Flow"
//! points = 0.5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::{BattleEngine, CatalogError, Criterion, ScoringCatalog, DEFAULT_NAMES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scoring catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BattleConfig {
    /// 新对战与重置后使用的选手名
    pub default_names: [String; 2],

    /// 评分项，顺序即展示顺序
    pub criteria: Vec<Criterion>,

    /// 为 true 时，对已结束的对战推进回合会报 `IllegalTransition`
    pub strict_transitions: bool,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            default_names: DEFAULT_NAMES.map(String::from),
            criteria: ScoringCatalog::standard().criteria().to_vec(),
            strict_transitions: false,
        }
    }
}

impl BattleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, name) in self.default_names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "default name #{} must not be blank",
                    index + 1
                )));
            }
        }
        self.catalog()?;
        Ok(())
    }

    pub fn catalog(&self) -> Result<ScoringCatalog, ConfigError> {
        Ok(ScoringCatalog::try_new(self.criteria.clone())?)
    }

    pub fn build_engine(&self) -> Result<BattleEngine, ConfigError> {
        self.validate()?;
        Ok(BattleEngine::new()
            .with_catalog(self.catalog()?)
            .with_default_names(self.default_names.clone())
            .with_strict_transitions(self.strict_transitions))
    }
}
