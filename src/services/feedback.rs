//! 评语服务 - 业务能力层
//!
//! 按得分率分档生成单题评语

use crate::config::FeedbackThresholds;
use crate::models::{Criterion, QuestionTotals};
use crate::services::aggregator::extract_max_points;

const STRONG_MESSAGE: &str = "Excellent work on this question. You demonstrated a strong understanding of the concepts and provided a comprehensive answer that addresses most of the key points in the rubric.";

const NEEDS_WORK_MESSAGE: &str = "This question needs more work. Focus on improving your understanding of the core concepts and providing more comprehensive answers that address all aspects of the question.";

const UNSCORED_MESSAGE: &str = "This question could not be scored because none of its rubric criteria carry any marks.";

/// 评语档位
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackTier {
    /// 表现优秀
    Strong,
    /// 良好，附带最薄弱的评分项
    Good { weakest: Option<String> },
    /// 需要改进
    NeedsImprovement,
    /// 满分为 0，无法计算得分率
    Unscored,
}

impl FeedbackTier {
    /// 评语正文
    pub fn message(&self) -> String {
        match self {
            FeedbackTier::Strong => STRONG_MESSAGE.to_string(),
            FeedbackTier::Good { weakest } => format!(
                "Good attempt on this question. You've covered the main points, but there's room for improvement in {}. Try to provide more detailed explanations and examples in future responses.",
                weakest.as_deref().unwrap_or("some areas")
            ),
            FeedbackTier::NeedsImprovement => NEEDS_WORK_MESSAGE.to_string(),
            FeedbackTier::Unscored => UNSCORED_MESSAGE.to_string(),
        }
    }
}

/// 找出得分率最低的评分项
///
/// 得分率相同时取先出现的一项；满分为 0 的评分项不参与比较
pub fn weakest_criterion(criteria: &[Criterion]) -> Option<&Criterion> {
    let mut weakest: Option<(&Criterion, f64)> = None;
    for criterion in criteria {
        let max = extract_max_points(&criterion.label, criterion.explicit_max).value;
        if max <= 0.0 {
            continue;
        }
        let ratio = criterion.awarded / max;
        match weakest {
            Some((_, lowest)) if ratio >= lowest => {}
            _ => weakest = Some((criterion, ratio)),
        }
    }
    weakest.map(|(criterion, _)| criterion)
}

/// 评语策略
#[derive(Debug, Clone, Default)]
pub struct FeedbackPolicy {
    thresholds: FeedbackThresholds,
}

impl FeedbackPolicy {
    pub fn new(thresholds: FeedbackThresholds) -> Self {
        Self { thresholds }
    }

    /// 根据单题得分确定评语档位
    pub fn classify(&self, totals: &QuestionTotals, criteria: &[Criterion]) -> FeedbackTier {
        let Some(percentage) = totals.percentage() else {
            return FeedbackTier::Unscored;
        };

        if percentage >= self.thresholds.strong {
            FeedbackTier::Strong
        } else if percentage >= self.thresholds.good {
            FeedbackTier::Good {
                weakest: weakest_criterion(criteria)
                    .map(|c| c.description().to_lowercase()),
            }
        } else {
            FeedbackTier::NeedsImprovement
        }
    }

    /// 生成评语
    pub fn feedback(&self, totals: &QuestionTotals, criteria: &[Criterion]) -> String {
        self.classify(totals, criteria).message()
    }
}
