use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 统计分析错误（在渲染之前抛出）
    #[error("分析错误: {0}")]
    Analysis(#[from] AnalysisError),
    /// 报告渲染错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 数据源错误
    #[error("数据源错误: {0}")]
    Source(#[from] SourceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 统计分析错误
///
/// 全部是确定性的逻辑错误，重试没有意义
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 题目记录不合法（例如没有评分项）
    #[error("题目 {question} 记录不合法: {reason}")]
    InvalidRecord { question: String, reason: String },
    /// 没有可用于统计的数据
    #[error("没有可用于统计的数据")]
    EmptyInput,
    /// 无法识别的 Bloom 分类
    #[error("题目 {question} 的分类 '{label}' 无法识别")]
    UnknownCategory { question: String, label: String },
}

/// 报告渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 单个块的高度超过一整页的可用高度
    #[error("内容块 '{block}' 高度 {height:.1} 超过单页可用高度 {capacity:.1}")]
    RenderOverflow {
        block: String,
        height: f32,
        capacity: f32,
    },
    /// PDF 编码失败
    #[error("PDF 编码失败: {source}")]
    PdfEncode {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 数据源错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回了非成功状态码
    #[error("请求返回错误状态 ({url}): {status}")]
    BadStatus { url: String, status: u16 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {key} 的值不合法: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建题目记录不合法错误
    pub fn invalid_record(question: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Analysis(AnalysisError::InvalidRecord {
            question: question.into(),
            reason: reason.into(),
        })
    }

    /// 创建分类无法识别错误
    pub fn unknown_category(question: impl Into<String>, label: impl Into<String>) -> Self {
        AppError::Analysis(AnalysisError::UnknownCategory {
            question: question.into(),
            label: label.into(),
        })
    }

    /// 创建渲染溢出错误
    pub fn render_overflow(block: impl Into<String>, height: f32, capacity: f32) -> Self {
        AppError::Render(RenderError::RenderOverflow {
            block: block.into(),
            height,
            capacity,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建配置值错误
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        })
    }

    /// 是否为统计阶段的错误
    pub fn is_analysis(&self) -> bool {
        matches!(self, AppError::Analysis(_))
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Render(RenderError::PdfEncode {
            source: Box::new(err),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convenience_constructors_pick_the_right_branch() {
        let err = AppError::invalid_record("question1", "没有评分项");
        assert!(err.is_analysis());
        assert!(err.to_string().contains("question1"));

        let err = AppError::render_overflow("题目 3", 300.0, 250.0);
        assert!(!err.is_analysis());
        assert!(matches!(
            err,
            AppError::Render(RenderError::RenderOverflow { .. })
        ));
    }

    #[test]
    fn test_empty_input_message() {
        let err: AppError = AnalysisError::EmptyInput.into();
        assert_eq!(err.to_string(), "分析错误: 没有可用于统计的数据");
    }
}
