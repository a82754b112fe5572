use crate::error::{AppError, AppResult, FileError};
use crate::models::distribution::DistributionDataset;
use crate::models::question::RubricDataset;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 数据集内容：评分数据或带 Bloom 分布的题目集
#[derive(Debug, Clone)]
pub enum DatasetContent {
    /// `{"question1": {...}, ...}`
    Rubric(RubricDataset),
    /// `{"questions": [...]}` 或直接是题目数组
    Distribution(DistributionDataset),
}

impl DatasetContent {
    /// 按 JSON 形态判断数据集类型
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let value: JsonValue = serde_json::from_str(content)?;
        let has_question_list = value
            .get("questions")
            .is_some_and(JsonValue::is_array);

        if value.is_array() {
            let questions = serde_json::from_value(value)?;
            Ok(Self::Distribution(DistributionDataset::new(questions)))
        } else if has_question_list {
            Ok(Self::Distribution(serde_json::from_value(value)?))
        } else {
            Ok(Self::Rubric(serde_json::from_value(value)?))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DatasetContent::Rubric(dataset) => dataset.len(),
            DatasetContent::Distribution(dataset) => dataset.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RubricDataset> for DatasetContent {
    fn from(dataset: RubricDataset) -> Self {
        DatasetContent::Rubric(dataset)
    }
}

impl From<DistributionDataset> for DatasetContent {
    fn from(dataset: DistributionDataset) -> Self {
        DatasetContent::Distribution(dataset)
    }
}

/// 带名称的数据集（名称取自文件名）
#[derive(Debug, Clone)]
pub struct NamedDataset {
    pub name: String,
    pub path: Option<PathBuf>,
    pub dataset: DatasetContent,
}

impl NamedDataset {
    pub fn new(name: impl Into<String>, dataset: impl Into<DatasetContent>) -> Self {
        Self {
            name: name.into(),
            path: None,
            dataset: dataset.into(),
        }
    }

    /// 报告标题：文件名中的 `-` / `_` 替换为空格
    pub fn title(&self) -> String {
        self.name
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 从 JSON 文件加载数据集
pub async fn load_dataset(json_file_path: &Path) -> AppResult<NamedDataset> {
    let path_str = json_file_path.display().to_string();

    let content = fs::read_to_string(json_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let dataset = DatasetContent::from_json_str(&content).map_err(|source| {
        AppError::File(FileError::JsonParseFailed {
            path: path_str.clone(),
            source,
        })
    })?;

    let name = json_file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());

    Ok(NamedDataset {
        name,
        path: Some(json_file_path.to_path_buf()),
        dataset,
    })
}

/// 从文件夹中加载所有 JSON 数据集
///
/// 单个文件加载失败只记录警告，不影响其他文件
pub async fn load_all_datasets(folder_path: &str) -> AppResult<Vec<NamedDataset>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }));
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }

    // read_dir 的顺序不稳定
    paths.sort();

    let mut datasets = Vec::with_capacity(paths.len());
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_dataset(&path).await {
            Ok(named) => {
                tracing::info!("成功加载 {} 个题目", named.dataset.len());
                datasets.push(named);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(datasets)
}
