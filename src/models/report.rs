use chrono::{DateTime, Local};

use crate::models::bloom::BloomCategory;
use crate::models::distribution::AnalyzedQuestion;
use crate::models::question::{QuestionKind, QuestionRecord, QuestionTotals, QuestionType};

/// 单个分类的汇总结果（每次统计时重新生成）
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate {
    pub category: BloomCategory,
    pub score_sum: f64,
    pub max_sum: f64,
    pub question_count: usize,
    pub percentage: u32,
}

/// 各题型的题目数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionTypeCounts {
    pub multiple_choice: usize,
    pub true_false: usize,
    pub short_answer: usize,
}

impl QuestionTypeCounts {
    /// 统计一组题型
    pub fn tally<'a>(kinds: impl IntoIterator<Item = &'a QuestionKind>) -> Self {
        let mut counts = Self::default();
        for kind in kinds {
            counts.count(kind);
        }
        counts
    }

    pub fn count(&mut self, kind: &QuestionKind) {
        match kind {
            QuestionKind::MultipleChoice { .. } => self.multiple_choice += 1,
            QuestionKind::TrueFalse { .. } => self.true_false += 1,
            QuestionKind::ShortAnswer => self.short_answer += 1,
        }
    }

    pub fn get(&self, question_type: QuestionType) -> usize {
        match question_type {
            QuestionType::MultipleChoice => self.multiple_choice,
            QuestionType::TrueFalse => self.true_false,
            QuestionType::ShortAnswer => self.short_answer,
        }
    }

    pub fn total(&self) -> usize {
        self.multiple_choice + self.true_false + self.short_answer
    }

    /// `(题型名称, 数量, 百分比)`，题目为空时百分比为 0
    pub fn shares(&self) -> [(&'static str, usize, u32); 3] {
        let total = self.total();
        let share = |count: usize| {
            if total == 0 {
                0
            } else {
                (100.0 * count as f64 / total as f64).round() as u32
            }
        };
        QuestionType::ALL.map(|question_type| {
            let count = self.get(question_type);
            (question_type.label(), count, share(count))
        })
    }
}

/// 带得分汇总的题目
#[derive(Debug, Clone)]
pub struct ScoredQuestion {
    pub record: QuestionRecord,
    pub totals: QuestionTotals,
}

/// 报告视图模型：生成一次，交给渲染器消费一次
#[derive(Debug, Clone)]
pub struct ReportViewModel {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub source_label: String,
    pub rubric_label: Option<String>,
    pub overall_score: f64,
    pub overall_max: f64,
    /// 没有可用数据时为 `None`，显示为中性默认值
    pub complexity_score: Option<u32>,
    pub category_breakdown: Vec<CategoryAggregate>,
    pub question_types: QuestionTypeCounts,
    pub questions: Vec<ScoredQuestion>,
}

impl ReportViewModel {
    /// 总得分百分比
    pub fn overall_percentage(&self) -> Option<u32> {
        QuestionTotals {
            awarded: self.overall_score,
            max: self.overall_max,
        }
        .percentage()
    }
}

/// 整体分布中单个分类的占比
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryShare {
    pub category: BloomCategory,
    pub percentage: u32,
}

/// 认知分析报告的视图模型
///
/// 同一个模型也用于试卷导出
#[derive(Debug, Clone)]
pub struct CognitiveViewModel {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub source_label: String,
    /// 整体分布全为 0 时为 `None`
    pub complexity_score: Option<u32>,
    /// 六个分类按规范顺序排列，包括占比为 0 的分类
    pub distribution: Vec<CategoryShare>,
    pub question_types: QuestionTypeCounts,
    pub questions: Vec<AnalyzedQuestion>,
}

impl CognitiveViewModel {
    /// 某一题型的题目，保持原始顺序
    pub fn questions_of(
        &self,
        question_type: QuestionType,
    ) -> impl Iterator<Item = &AnalyzedQuestion> + '_ {
        self.questions
            .iter()
            .filter(move |q| q.kind.question_type() == question_type)
    }
}

/// 报告元信息
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub source_label: String,
    pub rubric_label: Option<String>,
    pub generated_at: DateTime<Local>,
}

impl ReportMeta {
    pub fn new(title: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_label: source_label.into(),
            rubric_label: None,
            generated_at: Local::now(),
        }
    }

    pub fn with_rubric(mut self, rubric_label: Option<String>) -> Self {
        self.rubric_label = rubric_label;
        self
    }

    pub fn generated_at(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = generated_at;
        self
    }
}
