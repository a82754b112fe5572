use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::bloom::BloomCategory;
use crate::models::question::{first_prompt, resolve_kind, QuestionKind};

/// 小数形式的分布各项之和不会超过这个值
const FRACTION_SUM_LIMIT: f64 = 1.0 + 1e-6;

/// 百分比之和偏离 100 超过该值时给出警告
const SUM_TOLERANCE: f64 = 1.0;

/// 单题在六个认知层级上的占比（百分比）
///
/// 数据源可能给出小数（各项和为 1）或百分比（各项和为 100），导入时统一为百分比
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BloomDistribution {
    shares: [f64; 6],
}

impl BloomDistribution {
    /// 从 `(分类, 百分比)` 构造，未出现的分类为 0
    pub fn from_percentages(pairs: impl IntoIterator<Item = (BloomCategory, f64)>) -> Self {
        let mut shares = [0.0; 6];
        for (category, value) in pairs {
            shares[category.rank()] = value;
        }
        Self { shares }
    }

    pub fn get(&self, category: BloomCategory) -> f64 {
        self.shares[category.rank()]
    }

    /// 按规范顺序遍历全部六个分类
    pub fn iter(&self) -> impl Iterator<Item = (BloomCategory, f64)> + '_ {
        BloomCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    /// 只保留占比大于 0 的分类
    pub fn nonzero(&self) -> impl Iterator<Item = (BloomCategory, f64)> + '_ {
        self.iter().filter(|(_, value)| *value > 0.0)
    }

    pub fn total(&self) -> f64 {
        self.shares.iter().sum()
    }

    /// 解析 `{"Analysing": 0.4, ...}` 形式的分布
    ///
    /// 标签不区分大小写；负数、非数字、无法识别或重复的分类都视为不合法记录
    pub fn from_json_map(
        key: &str,
        map: &serde_json::Map<String, JsonValue>,
    ) -> AppResult<Self> {
        let mut shares = [0.0; 6];
        let mut seen = [false; 6];

        for (label, value) in map {
            let category = BloomCategory::parse(label)
                .ok_or_else(|| AppError::unknown_category(key, label))?;
            let value = value
                .as_f64()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| {
                    AppError::invalid_record(key, format!("分类 '{}' 的占比不合法: {}", label, value))
                })?;
            if seen[category.rank()] {
                return Err(AppError::invalid_record(
                    key,
                    format!("分类 {} 出现了多次", category),
                ));
            }
            seen[category.rank()] = true;
            shares[category.rank()] = value;
        }

        let sum: f64 = shares.iter().sum();
        let is_fraction = sum > 0.0 && sum <= FRACTION_SUM_LIMIT && shares.iter().all(|v| *v <= 1.0);
        if is_fraction {
            for share in shares.iter_mut() {
                *share *= 100.0;
            }
        }

        let distribution = Self { shares };
        let total = distribution.total();
        if total > 0.0 && (total - 100.0).abs() > SUM_TOLERANCE {
            warn!("[{}] Bloom 分布合计为 {:.1}%，不是 100%", key, total);
        }
        Ok(distribution)
    }
}

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// 带 Bloom 分布的题目（认知分析报告和试卷导出使用）
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedQuestion {
    /// 报告内的序号（从1开始）
    pub id: usize,
    /// 数据源中的标识，用于日志和错误信息
    pub key: String,
    pub prompt_text: String,
    pub kind: QuestionKind,
    /// 简答题的参考答案
    pub answer_text: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub distribution: BloomDistribution,
}

/// 数据源中的单题（带分布）
///
/// 题干可能在 `text` / `question` / `statement` 中；分布字段名为 `bloom` 或 `taxonomy`
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionQuestionDetail {
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(rename = "type", default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub answer: Option<JsonValue>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "taxonomy")]
    pub bloom: Option<serde_json::Map<String, JsonValue>>,
}

impl DistributionQuestionDetail {
    /// 数据源给出的 id（数字或字符串），没有时按序号生成
    fn source_key(&self, id: usize) -> String {
        match &self.id {
            Some(JsonValue::Number(n)) => format!("question{}", n),
            Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => format!("question{}", id),
        }
    }

    pub fn into_question(self, id: usize) -> AppResult<AnalyzedQuestion> {
        let key = self.source_key(id);

        let prompt_text = first_prompt(&[
            self.text.as_deref(),
            self.question.as_deref(),
            self.statement.as_deref(),
        ])
        .ok_or_else(|| AppError::invalid_record(&key, "缺少题干"))?;

        let kind = resolve_kind(
            &key,
            self.question_type.as_deref(),
            self.options.as_deref(),
            self.answer.as_ref(),
            self.statement.is_some(),
        )?;

        let answer_text = match &kind {
            QuestionKind::ShortAnswer => self
                .answer
                .as_ref()
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            _ => None,
        };

        let difficulty = match self.difficulty.as_deref() {
            Some(label) => Some(Difficulty::parse(label).ok_or_else(|| {
                AppError::invalid_record(&key, format!("未知难度: {}", label))
            })?),
            None => None,
        };

        let map = self
            .bloom
            .ok_or_else(|| AppError::invalid_record(&key, "缺少 Bloom 分布"))?;
        let distribution = BloomDistribution::from_json_map(&key, &map)?;

        Ok(AnalyzedQuestion {
            id,
            key,
            prompt_text,
            kind,
            answer_text,
            difficulty,
            distribution,
        })
    }
}

/// 一份带分布的题目集：`{"questions": [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributionDataset {
    pub questions: Vec<DistributionQuestionDetail>,
}

impl DistributionDataset {
    pub fn new(questions: Vec<DistributionQuestionDetail>) -> Self {
        Self { questions }
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 转换为题目列表，遇到第一条不合法的记录即失败
    pub fn into_questions(self) -> AppResult<Vec<AnalyzedQuestion>> {
        self.questions
            .into_iter()
            .enumerate()
            .map(|(idx, detail)| detail.into_question(idx + 1))
            .collect()
    }
}
