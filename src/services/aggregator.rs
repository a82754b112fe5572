//! 统计服务 - 业务能力层
//!
//! 把题目记录转换为分类得分率、综合复杂度和单题得分

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::TaxonomyWeights;
use crate::error::{AnalysisError, AppError, AppResult};
use crate::models::{
    AnalyzedQuestion, BloomCategory, CategoryAggregate, CategoryShare, CognitiveViewModel,
    QuestionRecord, QuestionTotals, QuestionTypeCounts, ReportMeta, ReportViewModel,
    ScoredQuestion,
};

/// 满分标注没有给出时使用的默认满分
pub const DEFAULT_MAX_POINTS: f64 = 1.0;

/// 浮点累加误差容忍度
const SCORE_EPSILON: f64 = 1e-9;

/// 满分解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxPoints {
    pub value: f64,
    /// 是否使用了默认值
    pub defaulted: bool,
}

fn marks_regex() -> &'static Regex {
    static MARKS_RE: OnceLock<Regex> = OnceLock::new();
    MARKS_RE.get_or_init(|| {
        Regex::new(r"(?i)\(\s*(\d+(?:\.\d+)?)\s*marks?\s*\)").expect("valid regex")
    })
}

/// 解析评分项的满分
///
/// 显式满分优先；否则从标签中的 `(N mark)` / `(N marks)` 提取；都没有时返回 1 并标记 `defaulted`
pub fn extract_max_points(criterion_label: &str, explicit_max: Option<f64>) -> MaxPoints {
    if let Some(value) = explicit_max {
        return MaxPoints {
            value,
            defaulted: false,
        };
    }

    let parsed = marks_regex()
        .captures(criterion_label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    match parsed {
        Some(value) => MaxPoints {
            value,
            defaulted: false,
        },
        None => MaxPoints {
            value: DEFAULT_MAX_POINTS,
            defaulted: true,
        },
    }
}

/// 去掉标签中的满分标注，用于展示
pub fn strip_marks_annotation(criterion_label: &str) -> String {
    let stripped = marks_regex().replace_all(criterion_label, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        criterion_label.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 计算单题的得分和满分
///
/// 没有评分项、出现负分、或得分超过满分都视为不合法记录
pub fn compute_question_totals(question: &QuestionRecord) -> AppResult<QuestionTotals> {
    if question.criteria.is_empty() {
        return Err(AppError::invalid_record(&question.key, "没有评分项"));
    }

    let mut awarded = 0.0;
    let mut max = 0.0;
    for criterion in &question.criteria {
        if !criterion.awarded.is_finite() || criterion.awarded < 0.0 {
            return Err(AppError::invalid_record(
                &question.key,
                format!("评分项 '{}' 的得分不合法: {}", criterion.label, criterion.awarded),
            ));
        }

        let max_points = extract_max_points(&criterion.label, criterion.explicit_max);
        if !max_points.value.is_finite() || max_points.value < 0.0 {
            return Err(AppError::invalid_record(
                &question.key,
                format!("评分项 '{}' 的满分不合法: {}", criterion.label, max_points.value),
            ));
        }
        if max_points.defaulted {
            debug!(
                "[{}] 评分项 '{}' 没有满分标注，按 {} 分计",
                question.key, criterion.label, DEFAULT_MAX_POINTS
            );
        }

        awarded += criterion.awarded;
        max += max_points.value;
    }

    if awarded > max + SCORE_EPSILON {
        return Err(AppError::invalid_record(
            &question.key,
            format!("得分 {} 超过满分 {}", awarded, max),
        ));
    }

    if let Some(supplied) = question.supplied_total {
        if (supplied - awarded).abs() > SCORE_EPSILON {
            warn!(
                "[{}] 数据源给出的总分 {} 与评分项合计 {} 不一致，以评分项合计为准",
                question.key, supplied, awarded
            );
        }
    }

    Ok(QuestionTotals { awarded, max })
}

/// 按分类汇总
///
/// 输出始终按规范顺序排列；没有题目的分类直接省略，不补 0
pub fn aggregate_by_category(questions: &[QuestionRecord]) -> AppResult<Vec<CategoryAggregate>> {
    let mut totals = Vec::with_capacity(questions.len());
    for question in questions {
        totals.push((question.category, compute_question_totals(question)?));
    }
    Ok(group_by_category(totals))
}

fn group_by_category(
    totals: impl IntoIterator<Item = (BloomCategory, QuestionTotals)>,
) -> Vec<CategoryAggregate> {
    let mut groups: BTreeMap<BloomCategory, (f64, f64, usize)> = BTreeMap::new();
    for (category, question_totals) in totals {
        let entry = groups.entry(category).or_insert((0.0, 0.0, 0));
        entry.0 += question_totals.awarded;
        entry.1 += question_totals.max;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|(category, (score_sum, max_sum, question_count))| CategoryAggregate {
            category,
            score_sum,
            max_sum,
            question_count,
            percentage: if max_sum > 0.0 {
                (100.0 * score_sum / max_sum).round() as u32
            } else {
                0
            },
        })
        .collect()
}

/// 整体 Bloom 分布：逐分类求平均后取整
///
/// 六个分类全部输出（按规范顺序）；没有题目时全部为 0
pub fn overall_distribution(questions: &[AnalyzedQuestion]) -> Vec<CategoryShare> {
    BloomCategory::ALL
        .into_iter()
        .map(|category| {
            let percentage = if questions.is_empty() {
                0
            } else {
                let sum: f64 = questions.iter().map(|q| q.distribution.get(category)).sum();
                (sum / questions.len() as f64).round() as u32
            };
            CategoryShare {
                category,
                percentage,
            }
        })
        .collect()
}

/// 统计服务
///
/// 持有权重表；同一个实例可以被多个报告并发使用
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    weights: TaxonomyWeights,
}

impl Aggregator {
    pub fn new(weights: TaxonomyWeights) -> Self {
        Self { weights }
    }

    /// 计算综合复杂度（0-100）
    ///
    /// 输入为 `(分类, 百分比)`，可以是分类得分率，也可以是整体 Bloom 分布。
    /// `round(100 * Σ(p·w) / Σp)`，只统计百分比大于 0 的分类
    pub fn compute_complexity_score(
        &self,
        percentages: impl IntoIterator<Item = (BloomCategory, u32)>,
    ) -> AppResult<u32> {
        let mut weighted_sum = 0.0;
        let mut total = 0.0;

        for (category, percentage) in percentages.into_iter().filter(|(_, p)| *p > 0) {
            let percentage = f64::from(percentage);
            weighted_sum += percentage * self.weights.weight(category);
            total += percentage;
        }

        if total <= 0.0 {
            return Err(AnalysisError::EmptyInput.into());
        }

        Ok((100.0 * weighted_sum / total).round() as u32)
    }

    /// 生成报告视图模型
    ///
    /// 任一题目不合法即失败，不会生成部分统计
    pub fn build_view_model(
        &self,
        meta: ReportMeta,
        records: Vec<QuestionRecord>,
    ) -> AppResult<ReportViewModel> {
        let mut questions = Vec::with_capacity(records.len());
        let mut question_types = QuestionTypeCounts::default();

        for record in records {
            let totals = compute_question_totals(&record)?;
            debug!(
                "[{}] {} 得分 {}/{}",
                record.key, record.category, totals.awarded, totals.max
            );
            question_types.count(&record.kind);
            questions.push(ScoredQuestion { record, totals });
        }

        let category_breakdown = group_by_category(
            questions
                .iter()
                .map(|q| (q.record.category, q.totals)),
        );

        let complexity_score = self.optional_complexity(
            category_breakdown
                .iter()
                .map(|a| (a.category, a.percentage)),
        )?;

        let overall_score = questions.iter().map(|q| q.totals.awarded).sum();
        let overall_max = questions.iter().map(|q| q.totals.max).sum();

        Ok(ReportViewModel {
            title: meta.title,
            generated_at: meta.generated_at,
            source_label: meta.source_label,
            rubric_label: meta.rubric_label,
            overall_score,
            overall_max,
            complexity_score,
            category_breakdown,
            question_types,
            questions,
        })
    }

    /// 生成认知分析视图模型（也用于试卷导出）
    ///
    /// 复杂度由整体 Bloom 分布计算
    pub fn build_cognitive_view_model(
        &self,
        meta: ReportMeta,
        questions: Vec<AnalyzedQuestion>,
    ) -> AppResult<CognitiveViewModel> {
        let distribution = overall_distribution(&questions);
        for share in &distribution {
            debug!("整体分布 {}: {}%", share.category, share.percentage);
        }

        let complexity_score =
            self.optional_complexity(distribution.iter().map(|s| (s.category, s.percentage)))?;
        let question_types = QuestionTypeCounts::tally(questions.iter().map(|q| &q.kind));

        Ok(CognitiveViewModel {
            title: meta.title,
            generated_at: meta.generated_at,
            source_label: meta.source_label,
            complexity_score,
            distribution,
            question_types,
            questions,
        })
    }

    /// 没有可用数据时返回 `None`，由报告显示默认值
    fn optional_complexity(
        &self,
        percentages: impl IntoIterator<Item = (BloomCategory, u32)>,
    ) -> AppResult<Option<u32>> {
        match self.compute_complexity_score(percentages) {
            Ok(score) => Ok(Some(score)),
            Err(AppError::Analysis(AnalysisError::EmptyInput)) => {
                info!("没有非零的分类占比，复杂度显示为默认值");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
