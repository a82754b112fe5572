use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::models::bloom::BloomCategory;

/// 评分项：标签 + 得分
///
/// 标签中可能内嵌满分信息，例如 `Definition of embodiment (1 mark)`
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub label: String,
    pub awarded: f64,
    /// 单独给出的满分，优先于标签中的标注
    pub explicit_max: Option<f64>,
}

impl Criterion {
    pub fn new(label: impl Into<String>, awarded: f64) -> Self {
        Self {
            label: label.into(),
            awarded,
            explicit_max: None,
        }
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.explicit_max = Some(max);
        self
    }

    /// 去掉满分标注后的描述
    pub fn description(&self) -> String {
        crate::services::aggregator::strip_marks_annotation(&self.label)
    }
}

/// 题型分组（报告按此顺序分组展示）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    /// 报告中显示的题型名称
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True/False",
            QuestionType::ShortAnswer => "Short Answer",
        }
    }
}

/// 题型（在导入时一次性确定）
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// 选择题
    MultipleChoice {
        options: Vec<String>,
        correct: Option<String>,
    },
    /// 判断题
    TrueFalse { answer: Option<bool> },
    /// 简答题
    ShortAnswer,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer => QuestionType::ShortAnswer,
        }
    }

    /// 报告中显示的题型名称
    pub fn label(&self) -> &'static str {
        self.question_type().label()
    }
}

/// 确定题型：显式 `type` 优先，否则按字段形态推断
///
/// 有 `options` 为选择题；有 `statement` 或布尔答案为判断题；其余为简答题
pub(crate) fn resolve_kind(
    key: &str,
    question_type: Option<&str>,
    options: Option<&[String]>,
    answer: Option<&JsonValue>,
    has_statement: bool,
) -> AppResult<QuestionKind> {
    let multiple_choice = || QuestionKind::MultipleChoice {
        options: options.map(<[String]>::to_vec).unwrap_or_default(),
        correct: answer.and_then(|v| v.as_str().map(str::to_string)),
    };
    let true_false = || QuestionKind::TrueFalse {
        answer: match answer {
            Some(JsonValue::Bool(b)) => Some(*b),
            Some(JsonValue::String(s)) => s.trim().to_lowercase().parse::<bool>().ok(),
            _ => None,
        },
    };

    if let Some(question_type) = question_type {
        let normalized = question_type.trim().to_lowercase();
        return match normalized.as_str() {
            "mcq" | "multiple choice" | "multiplechoice" => Ok(multiple_choice()),
            "true/false" | "truefalse" | "tf" => Ok(true_false()),
            "qna" | "short answer" | "shortanswer" => Ok(QuestionKind::ShortAnswer),
            _ => Err(AppError::invalid_record(
                key,
                format!("未知题型: {}", question_type),
            )),
        };
    }

    if options.is_some() {
        Ok(multiple_choice())
    } else if has_statement || matches!(answer, Some(JsonValue::Bool(_))) {
        Ok(true_false())
    } else {
        Ok(QuestionKind::ShortAnswer)
    }
}

/// 取第一个非空的题干
pub(crate) fn first_prompt<'a>(candidates: &[Option<&'a str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// 规范化后的题目记录
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    /// 报告内的序号（从1开始）
    pub id: usize,
    /// 数据源中的键，例如 `question3`
    pub key: String,
    pub prompt_text: String,
    pub category: BloomCategory,
    pub kind: QuestionKind,
    pub answer_text: Option<String>,
    pub criteria: Vec<Criterion>,
    /// 数据源直接给出的总分（仅用于校验）
    pub supplied_total: Option<f64>,
}

impl QuestionRecord {
    /// 创建一道简答题记录
    pub fn short_answer(
        id: usize,
        prompt_text: impl Into<String>,
        category: BloomCategory,
        criteria: Vec<Criterion>,
    ) -> Self {
        Self {
            id,
            key: format!("question{}", id),
            prompt_text: prompt_text.into(),
            category,
            kind: QuestionKind::ShortAnswer,
            answer_text: None,
            criteria,
            supplied_total: None,
        }
    }

    pub fn with_kind(mut self, kind: QuestionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer_text = Some(answer.into());
        self
    }
}

/// 单题得分汇总
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionTotals {
    pub awarded: f64,
    pub max: f64,
}

impl QuestionTotals {
    /// 得分百分比；满分为 0 时不参与比例计算
    pub fn percentage(&self) -> Option<u32> {
        if self.max > 0.0 {
            Some((100.0 * self.awarded / self.max).round() as u32)
        } else {
            None
        }
    }
}

/// 数据源中的单题详情
///
/// 字段形态不固定：`question` / `statement` 二选一，`answer` 可能是字符串或布尔值
#[derive(Debug, Clone, Deserialize)]
pub struct RubricQuestionDetail {
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
    pub student_answer: Option<String>,
    pub bloom_category: String,
    #[serde(default)]
    pub rubric_breakdown: serde_json::Map<String, JsonValue>,
    #[serde(default)]
    pub total_score: Option<f64>,
}

impl RubricQuestionDetail {
    /// 转换为规范化的题目记录
    ///
    /// # 参数
    /// - `id`: 报告内序号
    /// - `key`: 数据源中的键
    pub fn into_record(self, id: usize, key: String) -> AppResult<QuestionRecord> {
        let category = BloomCategory::parse(&self.bloom_category)
            .ok_or_else(|| AppError::unknown_category(&key, &self.bloom_category))?;

        let prompt_text = first_prompt(&[self.question.as_deref(), self.statement.as_deref()])
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
                .student_answer
                .clone()
                .or_else(|| self.answer.as_ref().and_then(|v| v.as_str().map(str::to_string))),
            _ => self.student_answer.clone(),
        };

        let mut criteria = Vec::with_capacity(self.rubric_breakdown.len());
        for (label, value) in self.rubric_breakdown {
            let awarded = value.as_f64().ok_or_else(|| {
                AppError::invalid_record(&key, format!("评分项 '{}' 的得分不是数字: {}", label, value))
            })?;
            criteria.push(Criterion::new(label, awarded));
        }

        Ok(QuestionRecord {
            id,
            key,
            prompt_text,
            category,
            kind,
            answer_text,
            criteria,
            supplied_total: self.total_score,
        })
    }
}

/// 一份评分数据集：有序的 `题目键 -> 详情` 映射
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "serde_json::Map<String, JsonValue>")]
pub struct RubricDataset {
    entries: Vec<(String, RubricQuestionDetail)>,
}

impl RubricDataset {
    pub fn new(entries: Vec<(String, RubricQuestionDetail)>) -> Self {
        Self { entries }
    }

    /// 从 JSON 文本解析，保持键的原始顺序
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, RubricQuestionDetail)] {
        &self.entries
    }

    /// 转换为题目记录列表，遇到第一条不合法的记录即失败
    pub fn into_records(self) -> AppResult<Vec<QuestionRecord>> {
        self.entries
            .into_iter()
            .enumerate()
            .map(|(idx, (key, detail))| detail.into_record(idx + 1, key))
            .collect()
    }
}

impl TryFrom<serde_json::Map<String, JsonValue>> for RubricDataset {
    type Error = serde_json::Error;

    fn try_from(map: serde_json::Map<String, JsonValue>) -> Result<Self, Self::Error> {
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let detail: RubricQuestionDetail = serde_json::from_value(value)?;
            entries.push((key, detail));
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: JsonValue) -> RubricQuestionDetail {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_short_answer_ingestion_keeps_criteria_order() {
        let record = detail(json!({
            "question": "Define embodiment.",
            "bloom_category": "Understanding",
            "student_answer": "Feeling that the avatar is your body.",
            "rubric_breakdown": {
                "Definition of embodiment (1 mark)": 1,
                "Connection to presence (1 mark)": 1,
                "Examples or justifications (1 mark)": 0
            },
            "total_score": 2
        }))
        .into_record(2, "question2".to_string())
        .unwrap();

        assert_eq!(record.id, 2);
        assert_eq!(record.category, BloomCategory::Understanding);
        assert_eq!(record.kind, QuestionKind::ShortAnswer);
        assert_eq!(record.answer_text.as_deref(), Some("Feeling that the avatar is your body."));
        assert_eq!(record.supplied_total, Some(2.0));
        let labels: Vec<&str> = record.criteria.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Definition of embodiment (1 mark)",
                "Connection to presence (1 mark)",
                "Examples or justifications (1 mark)"
            ]
        );
    }

    #[test]
    fn test_statement_with_boolean_answer_is_true_false() {
        let record = detail(json!({
            "statement": "Gymnosperms produce flowers.",
            "answer": false,
            "bloom_category": "remembering",
            "rubric_breakdown": { "Correct answer (1 mark)": 1 }
        }))
        .into_record(1, "q1".to_string())
        .unwrap();

        assert_eq!(record.prompt_text, "Gymnosperms produce flowers.");
        assert_eq!(record.kind, QuestionKind::TrueFalse { answer: Some(false) });
    }

    #[test]
    fn test_explicit_type_wins_over_shape() {
        let record = detail(json!({
            "type": "MCQ",
            "question": "Which alga yields agar?",
            "options": ["Gelidium", "Ulothrix", "Volvox"],
            "answer": "Gelidium",
            "bloom_category": "Remembering",
            "rubric_breakdown": { "Correct option (1 mark)": 1 }
        }))
        .into_record(1, "q1".to_string())
        .unwrap();

        match record.kind {
            QuestionKind::MultipleChoice { options, correct } => {
                assert_eq!(options.len(), 3);
                assert_eq!(correct.as_deref(), Some("Gelidium"));
            }
            other => panic!("题型解析错误: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let err = detail(json!({
            "question": "Q",
            "bloom_category": "Synthesis",
            "rubric_breakdown": { "A (1 mark)": 1 }
        }))
        .into_record(1, "question1".to_string())
        .unwrap_err();

        assert!(matches!(
            err,
            AppError::Analysis(crate::error::AnalysisError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_non_numeric_score_is_invalid() {
        let err = detail(json!({
            "question": "Q",
            "bloom_category": "Applying",
            "rubric_breakdown": { "A (1 mark)": "full" }
        }))
        .into_record(1, "question1".to_string())
        .unwrap_err();

        assert!(err.to_string().contains("question1"));
    }

    #[test]
    fn test_dataset_preserves_key_order() {
        let dataset = RubricDataset::from_json_str(
            r#"{
                "question10": {"question": "B", "bloom_category": "Applying", "rubric_breakdown": {"x": 1}},
                "question2": {"question": "A", "bloom_category": "Creating", "rubric_breakdown": {"y": 0}}
            }"#,
        )
        .unwrap();

        let records = dataset.into_records().unwrap();
        assert_eq!(records[0].key, "question10");
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].key, "question2");
        assert_eq!(records[1].id, 2);
    }

    #[test]
    fn test_string_answer_for_true_false() {
        let record = detail(json!({
            "type": "True/False",
            "statement": "Ulothrix reproduces by isogamy.",
            "answer": " TRUE ",
            "bloom_category": "Remembering",
            "rubric_breakdown": { "Correct answer (1 mark)": 1 }
        }))
        .into_record(1, "q1".to_string())
        .unwrap();

        assert_eq!(record.kind, QuestionKind::TrueFalse { answer: Some(true) });
        assert_eq!(record.kind.question_type(), QuestionType::TrueFalse);
        assert_eq!(record.kind.label(), "True/False");
    }

    #[test]
    fn test_blank_question_falls_back_to_statement() {
        assert_eq!(
            first_prompt(&[Some("   "), Some("Mosses are vascular.")]),
            Some("Mosses are vascular.".to_string())
        );
        assert_eq!(first_prompt(&[None, Some("")]), None);
    }

    #[test]
    fn test_question_percentage() {
        let totals = QuestionTotals { awarded: 1.0, max: 2.0 };
        assert_eq!(totals.percentage(), Some(50));
        let totals = QuestionTotals { awarded: 0.0, max: 0.0 };
        assert_eq!(totals.percentage(), None);
    }
}
