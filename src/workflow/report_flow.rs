//! 报告生成流程 - 流程层
//!
//! 核心职责：定义"一份报告"的完整生成流程
//!
//! 流程顺序：
//! 1. 数据集 → 规范化题目记录
//! 2. 统计 → 视图模型
//! 3. 渲染 → 分页 → PDF 字节
//! 4. 写入输出目录
//!
//! 所有文档都渲染成功之后才开始写文件，渲染失败不会留下任何输出。

use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::ReportSettings;
use crate::error::AppResult;
use crate::models::{
    AnalyzedQuestion, CognitiveViewModel, DatasetContent, DistributionDataset, NamedDataset,
    QuestionRecord, ReportMeta, ReportViewModel, RubricDataset,
};
use crate::render::{LayoutConfig, RenderedReport, ReportRenderer};
use crate::services::{Aggregator, FeedbackPolicy, ReportWriter};
use crate::workflow::report_ctx::ReportCtx;

/// 认知分析报告文件名前缀
const COGNITIVE_FILE_PREFIX: &str = "cognitive analysis";

/// 单个数据集的生成结果
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub title: String,
    /// 写入的文件（认知分析数据集可能同时导出试卷）
    pub paths: Vec<PathBuf>,
    pub page_count: usize,
    pub question_count: usize,
    /// 仅评分数据集有总分
    pub overall_percentage: Option<u32>,
    pub complexity_score: Option<u32>,
}

/// 报告生成流程
///
/// - 编排统计、渲染、写入三个步骤
/// - 不持有任何可变状态，可在多个任务之间共享
pub struct ReportFlow {
    aggregator: Aggregator,
    feedback: FeedbackPolicy,
    layout: LayoutConfig,
    writer: ReportWriter,
    rubric_label: Option<String>,
    question_paper: bool,
}

impl ReportFlow {
    pub fn new(
        settings: &ReportSettings,
        writer: ReportWriter,
        rubric_label: Option<String>,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(settings.weights.clone()),
            feedback: FeedbackPolicy::new(settings.feedback.clone()),
            layout: settings.layout.clone(),
            writer,
            rubric_label,
            question_paper: false,
        }
    }

    /// 带 Bloom 分布的数据集是否同时导出试卷
    pub fn with_question_paper(mut self, enabled: bool) -> Self {
        self.question_paper = enabled;
        self
    }

    fn renderer(&self) -> ReportRenderer {
        ReportRenderer::new(self.layout.clone(), self.feedback.clone())
    }

    /// 统计并生成视图模型
    pub fn analyze(
        &self,
        title: &str,
        ctx: &ReportCtx,
        records: Vec<QuestionRecord>,
    ) -> AppResult<ReportViewModel> {
        let meta = ReportMeta::new(title, ctx.source_label.as_str())
            .with_rubric(self.rubric_label.clone());
        self.aggregator.build_view_model(meta, records)
    }

    /// 统计整体 Bloom 分布并生成认知分析视图模型
    pub fn analyze_distribution(
        &self,
        title: &str,
        ctx: &ReportCtx,
        questions: Vec<AnalyzedQuestion>,
    ) -> AppResult<CognitiveViewModel> {
        let meta = ReportMeta::new(title, ctx.source_label.as_str());
        self.aggregator.build_cognitive_view_model(meta, questions)
    }

    /// 渲染视图模型
    pub fn render(&self, view_model: &ReportViewModel) -> AppResult<RenderedReport> {
        self.renderer().render(view_model)
    }

    /// 完整流程：统计 → 渲染 → 编码 → 写入
    pub async fn run(&self, named: NamedDataset, ctx: &ReportCtx) -> AppResult<ReportOutcome> {
        let title = named.title();
        info!("{} 📥 共 {} 道题目", ctx, named.dataset.len());

        match named.dataset {
            DatasetContent::Rubric(dataset) => self.run_rubric(title, dataset, ctx).await,
            DatasetContent::Distribution(dataset) => {
                self.run_distribution(title, dataset, ctx).await
            }
        }
    }

    async fn run_rubric(
        &self,
        title: String,
        dataset: RubricDataset,
        ctx: &ReportCtx,
    ) -> AppResult<ReportOutcome> {
        let records = dataset.into_records()?;
        let view_model = self.analyze(&title, ctx, records)?;
        info!(
            "{} 📊 总分 {}/{}，复杂度 {}",
            ctx,
            view_model.overall_score,
            view_model.overall_max,
            fmt_score(view_model.complexity_score)
        );

        let rendered = self.render(&view_model)?;
        let bytes = rendered.to_pdf()?;
        debug!(
            "{} 渲染完成: {} 页, {} 字节",
            ctx,
            rendered.page_count(),
            bytes.len()
        );

        let path = self
            .writer
            .write(&title, Local::now().date_naive(), &bytes)
            .await?;
        info!("{} ✓ 报告已写入 {}", ctx, path.display());

        Ok(ReportOutcome {
            title,
            paths: vec![path],
            page_count: rendered.page_count(),
            question_count: view_model.questions.len(),
            overall_percentage: view_model.overall_percentage(),
            complexity_score: view_model.complexity_score,
        })
    }

    async fn run_distribution(
        &self,
        title: String,
        dataset: DistributionDataset,
        ctx: &ReportCtx,
    ) -> AppResult<ReportOutcome> {
        let questions = dataset.into_questions()?;
        let view_model = self.analyze_distribution(&title, ctx, questions)?;
        info!(
            "{} 🧠 认知分析: 复杂度 {}",
            ctx,
            fmt_score(view_model.complexity_score)
        );

        let mut documents = Vec::with_capacity(2);
        let cognitive = self.renderer().render_cognitive(&view_model)?;
        documents.push((
            format!("{} {}", COGNITIVE_FILE_PREFIX, title),
            cognitive.page_count(),
            cognitive.to_pdf()?,
        ));
        if self.question_paper {
            let paper = self.renderer().render_question_paper(&view_model)?;
            documents.push((title.clone(), paper.page_count(), paper.to_pdf()?));
        }
        debug!("{} 渲染完成: {} 份文档", ctx, documents.len());

        let date = Local::now().date_naive();
        let mut paths = Vec::with_capacity(documents.len());
        let mut page_count = 0;
        for (file_title, pages, bytes) in documents {
            let path = self.writer.write(&file_title, date, &bytes).await?;
            info!("{} ✓ 已写入 {}", ctx, path.display());
            page_count += pages;
            paths.push(path);
        }

        Ok(ReportOutcome {
            title,
            paths,
            page_count,
            question_count: view_model.questions.len(),
            overall_percentage: None,
            complexity_score: view_model.complexity_score,
        })
    }
}

fn fmt_score(score: Option<u32>) -> String {
    score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, RenderError};
    use crate::models::fallback::FALLBACK_SOURCE_LABEL;
    use crate::models::{fallback_dataset, BloomCategory, Criterion, RubricQuestionDetail};
    use serde_json::json;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bloom_report_flow_{}_{}", name, std::process::id()))
    }

    async fn pdf_files(dir: &PathBuf) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Some(entry) = entries.next_entry().await.unwrap() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        names
    }

    fn flow(output_dir: PathBuf) -> ReportFlow {
        ReportFlow::new(
            &ReportSettings::default(),
            ReportWriter::new(output_dir),
            Some("VR Midterm Rubric".to_string()),
        )
    }

    #[test]
    fn test_analyze_carries_meta() {
        let flow = flow(std::env::temp_dir());
        let ctx = ReportCtx::new("vr-midterm", 1, FALLBACK_SOURCE_LABEL);
        let records = fallback_dataset().into_records().unwrap();
        let vm = flow.analyze("vr midterm", &ctx, records).unwrap();

        assert_eq!(vm.title, "vr midterm");
        assert_eq!(vm.source_label, FALLBACK_SOURCE_LABEL);
        assert_eq!(vm.rubric_label.as_deref(), Some("VR Midterm Rubric"));
        assert_eq!(vm.questions.len(), 14);
    }

    #[test]
    fn test_invalid_record_stops_before_rendering() {
        let flow = flow(std::env::temp_dir());
        let ctx = ReportCtx::new("broken", 1, "unit test");
        let records = vec![QuestionRecord::short_answer(
            1,
            "Too many marks",
            BloomCategory::Applying,
            vec![Criterion::new("Only one (1 mark)", 2.0)],
        )];
        let err = flow.analyze("broken", &ctx, records).unwrap_err();
        assert!(err.is_analysis());
    }

    #[tokio::test]
    async fn test_run_writes_pdf() {
        let dir = scratch_dir("rubric");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let flow = flow(dir.clone());
        let ctx = ReportCtx::new("vr_midterm", 1, FALLBACK_SOURCE_LABEL);

        let outcome = flow
            .run(NamedDataset::new("vr_midterm", fallback_dataset()), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.title, "vr midterm");
        assert_eq!(outcome.question_count, 14);
        assert_eq!(outcome.overall_percentage, Some(73));
        assert_eq!(outcome.complexity_score, Some(61));
        assert!(outcome.page_count > 1);
        assert_eq!(outcome.paths.len(), 1);

        let file_name = outcome.paths[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("vr-midterm-"));
        assert!(file_name.ends_with(".pdf"));

        let bytes = tokio::fs::read(&outcome.paths[0]).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_oversized_question_writes_nothing() {
        let dir = scratch_dir("overflow");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let flow = flow(dir.clone());
        let ctx = ReportCtx::new("essay", 1, "unit test");

        let detail: RubricQuestionDetail = serde_json::from_value(json!({
            "question": vec!["word"; 4000].join(" "),
            "bloom_category": "Creating",
            "rubric_breakdown": { "Originality (1 mark)": 1 }
        }))
        .unwrap();
        let dataset = RubricDataset::new(vec![("question1".to_string(), detail)]);

        let err = flow
            .run(NamedDataset::new("essay", dataset), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Render(RenderError::RenderOverflow { .. })
        ));
        assert!(pdf_files(&dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_distribution_dataset_writes_cognitive_report() {
        let dir = scratch_dir("cognitive");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let flow = flow(dir.clone());
        let ctx = ReportCtx::new("ml-quiz", 1, "unit test");
        let dataset =
            DistributionDataset::from_json_str(include_str!("../../data/sample_cognitive.json"))
                .unwrap();

        let outcome = flow
            .run(NamedDataset::new("ml-quiz", dataset), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.question_count, 5);
        assert_eq!(outcome.complexity_score, Some(49));
        assert_eq!(outcome.overall_percentage, None);

        let files = pdf_files(&dir).await;
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("cognitive-analysis-ml-quiz-"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_question_paper_export() {
        let dir = scratch_dir("paper");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let flow = flow(dir.clone()).with_question_paper(true);
        let ctx = ReportCtx::new("ml-quiz", 1, "unit test");
        let dataset =
            DistributionDataset::from_json_str(include_str!("../../data/sample_cognitive.json"))
                .unwrap();

        let outcome = flow
            .run(NamedDataset::new("ml-quiz", dataset), &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.paths.len(), 2);

        let files = pdf_files(&dir).await;
        assert_eq!(files.len(), 2);
        assert!(files[0].starts_with("cognitive-analysis-ml-quiz-"));
        assert!(files[1].starts_with("ml-quiz-"));
        for path in &outcome.paths {
            let bytes = tokio::fs::read(path).await.unwrap();
            assert!(bytes.starts_with(b"%PDF-"));
        }

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
