use crate::core::load::{LoadSettings, DEFAULT_BATCH_SIZE};
use crate::core::transform::{TrimDefaults, TrimTransformer};
use crate::domain::model::KeyingPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::logger::{self, LogFormat};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: PipelineInfo,
    pub load: LoadConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// 目標 sink 識別（資料表名稱、檔案路徑等）
    pub target: String,
    pub batch_size: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub on_length_mismatch: Option<KeyingPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub defaults: Option<TrimDefaultsConfig>,
    #[serde(default)]
    pub trim: Vec<TrimRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimDefaultsConfig {
    pub mode: Option<String>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimRuleConfig {
    pub column: Option<String>,
    pub index: Option<usize>,
    pub all_columns: Option<bool>,
    pub mode: Option<String>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl PipelineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TARGET_TABLE})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_non_empty_string("load.target", &self.load.target)?;

        if let Some(batch_size) = self.load.batch_size {
            validation::validate_positive_number("load.batch_size", batch_size, 1)?;
        }

        if let Some(columns) = &self.load.columns {
            validation::validate_column_names("load.columns", columns)?;
        }

        for (i, rule) in self.transform.trim.iter().enumerate() {
            let selectors = [
                rule.column.is_some(),
                rule.index.is_some(),
                rule.all_columns == Some(true),
            ]
            .iter()
            .filter(|set| **set)
            .count();

            if selectors != 1 {
                return Err(EtlError::ConfigValidationError {
                    field: format!("transform.trim[{}]", i),
                    message: "Set exactly one of 'column', 'index' or 'all_columns = true'"
                        .to_string(),
                });
            }
            if let Some(column) = &rule.column {
                validation::validate_non_empty_string(
                    &format!("transform.trim[{}].column", i),
                    column,
                )?;
            }
        }

        if let Some(level) = self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            validation::validate_one_of(
                "logging.level",
                level,
                &["error", "warn", "info", "debug", "trace"],
            )?;
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.pipeline.name
    }

    pub fn target(&self) -> &str {
        &self.load.target
    }

    pub fn batch_size(&self) -> usize {
        self.load.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn keying_policy(&self) -> KeyingPolicy {
        self.load.on_length_mismatch.unwrap_or_default()
    }

    pub fn load_settings(&self) -> LoadSettings {
        LoadSettings {
            batch_size: self.batch_size(),
            columns: self.load.columns.clone(),
            keying: self.keying_policy(),
        }
    }

    pub fn trim_defaults(&self) -> TrimDefaults {
        let mut defaults = TrimDefaults::default();
        if let Some(configured) = &self.transform.defaults {
            if let Some(mode) = &configured.mode {
                defaults.mode = mode.clone();
            }
            if let Some(mask) = &configured.mask {
                defaults.mask = mask.clone();
            }
        }
        defaults
    }

    /// 依設定順序建立 TrimTransformer；沒有任何規則時回傳 None
    pub fn trim_transformer(&self) -> Result<Option<TrimTransformer>> {
        if self.transform.trim.is_empty() {
            return Ok(None);
        }

        let mut transformer = TrimTransformer::with_defaults(self.trim_defaults());
        for (i, rule) in self.transform.trim.iter().enumerate() {
            let mode = rule.mode.as_deref();
            let mask = rule.mask.as_deref();

            transformer = match (&rule.column, rule.index, rule.all_columns) {
                (_, _, Some(true)) => transformer.transform_all_columns(mode, mask),
                (Some(column), None, _) => transformer.transform_column(column.as_str(), mode, mask),
                (None, Some(index), _) => transformer.transform_column(index, mode, mask),
                _ => {
                    return Err(EtlError::ConfigValidationError {
                        field: format!("transform.trim[{}]", i),
                        message: "Set exactly one of 'column', 'index' or 'all_columns = true'"
                            .to_string(),
                    })
                }
            };
        }

        Ok(Some(transformer))
    }

    pub fn init_logging(&self, verbose: bool) {
        let format = self
            .logging
            .as_ref()
            .and_then(|l| l.format)
            .unwrap_or_default();

        match self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            Some(level) => {
                logger::init_logger_with_level(&format!("frame_pipes={}", level), format)
            }
            None => logger::init_logger(verbose, format),
        }
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
