use crate::error::{AppError, AppResult, FileError};
use crate::models::BloomCategory;
use crate::render::LayoutConfig;
use serde::Deserialize;
use std::path::Path;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 待处理的 JSON 数据集目录
    pub input_folder: String,
    /// PDF 输出目录
    pub output_dir: String,
    /// 同时渲染的报告数量
    pub max_concurrent_reports: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 远程评分数据地址（输入目录为空时使用）
    pub rubric_source_url: Option<String>,
    /// 评分权重 / 阈值 / 版式的 TOML 文件
    pub report_settings_path: Option<String>,
    /// 报告中显示的评分标准名称
    pub rubric_label: Option<String>,
    /// 带 Bloom 分布的数据集是否同时导出试卷
    pub export_question_paper: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_folder: "input_json".to_string(),
            output_dir: "reports".to_string(),
            max_concurrent_reports: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            rubric_source_url: None,
            report_settings_path: None,
            rubric_label: None,
            export_question_paper: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            max_concurrent_reports: std::env::var("MAX_CONCURRENT_REPORTS").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.max_concurrent_reports),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            rubric_source_url: std::env::var("RUBRIC_SOURCE_URL").ok().filter(|v| !v.is_empty()),
            report_settings_path: std::env::var("REPORT_SETTINGS").ok().filter(|v| !v.is_empty()),
            rubric_label: std::env::var("RUBRIC_LABEL").ok().filter(|v| !v.is_empty()),
            export_question_paper: std::env::var("EXPORT_QUESTION_PAPER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.export_question_paper),
        }
    }

    /// 加载报告设置；未配置文件时使用默认值
    pub fn load_report_settings(&self) -> AppResult<ReportSettings> {
        match &self.report_settings_path {
            Some(path) => ReportSettings::load(Path::new(path)),
            None => Ok(ReportSettings::default()),
        }
    }
}

/// Bloom 分类权重（越高阶权重越大）
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaxonomyWeights {
    pub remembering: f64,
    pub understanding: f64,
    pub applying: f64,
    pub analyzing: f64,
    pub evaluating: f64,
    pub creating: f64,
}

impl Default for TaxonomyWeights {
    fn default() -> Self {
        Self {
            remembering: 0.1,
            understanding: 0.2,
            applying: 0.4,
            analyzing: 0.6,
            evaluating: 0.8,
            creating: 1.0,
        }
    }
}

impl TaxonomyWeights {
    pub fn weight(&self, category: BloomCategory) -> f64 {
        match category {
            BloomCategory::Remembering => self.remembering,
            BloomCategory::Understanding => self.understanding,
            BloomCategory::Applying => self.applying,
            BloomCategory::Analyzing => self.analyzing,
            BloomCategory::Evaluating => self.evaluating,
            BloomCategory::Creating => self.creating,
        }
    }

    fn validate(&self) -> AppResult<()> {
        for category in BloomCategory::ALL {
            let weight = self.weight(category);
            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::invalid_config(
                    format!("weights.{}", category.name().to_lowercase()),
                    format!("权重必须是非负数，当前为 {}", weight),
                ));
            }
        }
        Ok(())
    }
}

/// 评语分档阈值（百分比）
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedbackThresholds {
    /// 不低于该值为"表现优秀"
    pub strong: u32,
    /// 不低于该值为"良好，但有待提高"
    pub good: u32,
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        Self { strong: 80, good: 60 }
    }
}

impl FeedbackThresholds {
    fn validate(&self) -> AppResult<()> {
        if self.strong > 100 || self.good > self.strong {
            return Err(AppError::invalid_config(
                "feedback",
                format!(
                    "需要满足 good <= strong <= 100，当前 good={} strong={}",
                    self.good, self.strong
                ),
            ));
        }
        Ok(())
    }
}

/// 报告设置：统计权重、评语阈值、版式
///
/// 作为不可变值传入统计和渲染环节
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub weights: TaxonomyWeights,
    pub feedback: FeedbackThresholds,
    pub layout: LayoutConfig,
}

impl ReportSettings {
    /// 从 TOML 文件加载
    pub fn load(path: &Path) -> AppResult<Self> {
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(&path_str, e))?;
        let settings: Self = toml::from_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path_str,
                source,
            })
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let settings: Self = toml::from_str(content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: String::new(),
                source,
            })
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.weights.validate()?;
        self.feedback.validate()?;
        self.layout.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = TaxonomyWeights::default();
        assert_eq!(weights.weight(BloomCategory::Remembering), 0.1);
        assert_eq!(weights.weight(BloomCategory::Analyzing), 0.6);
        assert_eq!(weights.weight(BloomCategory::Creating), 1.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ReportSettings::from_toml_str(
            r#"
            [weights]
            creating = 2.0

            [feedback]
            good = 50
            "#,
        )
        .unwrap();

        assert_eq!(settings.weights.creating, 2.0);
        assert_eq!(settings.weights.applying, 0.4);
        assert_eq!(settings.feedback.good, 50);
        assert_eq!(settings.feedback.strong, 80);
        assert_eq!(settings.layout, LayoutConfig::default());
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let err = ReportSettings::from_toml_str("[feedback]\nstrong = 50\ngood = 70\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let err = ReportSettings::from_toml_str("[weights]\napplying = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("weights.applying"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ReportSettings::from_toml_str("[weights\n").unwrap_err();
        assert!(matches!(err, AppError::File(FileError::TomlParseFailed { .. })));
    }
}
