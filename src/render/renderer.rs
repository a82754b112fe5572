//! 报告渲染器
//!
//! 状态顺序：Init（标题信息）→ Summary（总分与分类进度）→ Detail（逐题）→ Terminal。
//! 每写一个内容块之前都会检查是否需要换页，内容块不会被拆到两页。
//! `render` 消费渲染器本身，每份文档需要新建一个实例。
//!
//! 同一套放置逻辑渲染三种文档：学习分析报告、认知分析报告、试卷。

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{
    AnalyzedQuestion, BloomDistribution, CognitiveViewModel, QuestionKind, QuestionType,
    ReportViewModel, ScoredQuestion,
};
use crate::render::layout::{
    Block, BlockKind, Cell, DrawItem, FontStyle, LayoutConfig, Page, PageCursor, PlacedBlock, Row,
};
use crate::render::pdf;
use crate::services::aggregator::extract_max_points;
use crate::services::FeedbackPolicy;

/// 学习分析报告大标题
pub const REPORT_HEADING: &str = "Learning Analytics Report";

/// 认知分析报告大标题
pub const COGNITIVE_HEADING: &str = "Cognitive Analysis Report";

const HEADING_SIZE: f32 = 18.0;
const TITLE_SIZE: f32 = 14.0;
const SECTION_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// 数值列的横坐标
const VALUE_COLUMN_X: f32 = 150.0;
const BAR_X: f32 = 110.0;
const BAR_WIDTH: f32 = 60.0;

/// 基线相对行顶的位置比例
const BASELINE_RATIO: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Summary,
    Detail,
    Terminal,
}

/// 渲染结果：已分页的内容
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub title: String,
    pub pages: Vec<Page>,
    layout: LayoutConfig,
}

impl RenderedReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 按顺序遍历所有内容块
    pub fn blocks(&self) -> impl Iterator<Item = &PlacedBlock> {
        self.pages.iter().flat_map(|page| page.blocks.iter())
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// 编码为 PDF 字节
    pub fn to_pdf(&self) -> AppResult<Vec<u8>> {
        pdf::encode_pdf(self)
    }
}

/// 报告渲染器
pub struct ReportRenderer {
    layout: LayoutConfig,
    feedback: FeedbackPolicy,
    pages: Vec<Page>,
    current: Vec<PlacedBlock>,
    cursor: PageCursor,
    phase: Phase,
}

impl ReportRenderer {
    pub fn new(layout: LayoutConfig, feedback: FeedbackPolicy) -> Self {
        let cursor = PageCursor::new(layout.top_margin, layout.usable_height);
        Self {
            layout,
            feedback,
            pages: Vec::new(),
            current: Vec::new(),
            cursor,
            phase: Phase::Init,
        }
    }

    /// 渲染整份学习分析报告
    ///
    /// 任何一个内容块出错都会放弃整份文档
    pub fn render(mut self, view_model: &ReportViewModel) -> AppResult<RenderedReport> {
        self.write_header(view_model)?;

        self.enter(Phase::Summary);
        self.write_summary(view_model)?;

        self.enter(Phase::Detail);
        for question in &view_model.questions {
            self.write_question(question)?;
        }

        self.enter(Phase::Terminal);
        Ok(self.finish(&view_model.title))
    }

    /// 渲染并直接输出 PDF 字节
    pub fn render_pdf(self, view_model: &ReportViewModel) -> AppResult<Vec<u8>> {
        self.render(view_model)?.to_pdf()
    }

    /// 渲染认知分析报告：整体分布、题型分布，按题型分组列出每题的认知层级
    pub fn render_cognitive(mut self, view_model: &CognitiveViewModel) -> AppResult<RenderedReport> {
        self.write_cognitive_header(view_model)?;

        self.enter(Phase::Summary);
        self.write_cognitive_summary(view_model)?;

        self.enter(Phase::Detail);
        for question_type in QuestionType::ALL {
            let mut group = view_model.questions_of(question_type).peekable();
            if group.peek().is_none() {
                continue;
            }
            self.place(
                Block::new(BlockKind::GroupHeading)
                    .text(
                        self.layout.left_margin,
                        SECTION_SIZE,
                        FontStyle::Bold,
                        format!("{} Questions:", question_type.label()),
                        self.layout.line_height * 1.4,
                    )
                    .spacing(self.layout.block_spacing),
            )?;
            for question in group {
                self.write_analyzed_question(question)?;
            }
        }

        self.enter(Phase::Terminal);
        Ok(self.finish(&view_model.title))
    }

    /// 渲染试卷：逐题列出题干、题型、难度、选项或参考答案和认知层级
    pub fn render_question_paper(
        mut self,
        view_model: &CognitiveViewModel,
    ) -> AppResult<RenderedReport> {
        let x = self.layout.left_margin;
        let line = self.layout.line_height;
        self.place(
            Block::new(BlockKind::Heading)
                .paragraph(
                    x,
                    HEADING_SIZE,
                    FontStyle::Bold,
                    &view_model.title,
                    self.width_from(x),
                    self.layout.heading_line_height,
                )
                .text(
                    x,
                    BODY_SIZE,
                    FontStyle::Regular,
                    format!(
                        "Generated on: {}",
                        view_model.generated_at.format("%B %-d, %Y %H:%M")
                    ),
                    line,
                )
                .spacing(self.layout.block_spacing * 2.0),
        )?;

        self.enter(Phase::Detail);
        for question in &view_model.questions {
            self.write_paper_question(question)?;
        }

        self.enter(Phase::Terminal);
        Ok(self.finish(&view_model.title))
    }

    fn enter(&mut self, next: Phase) {
        debug!("渲染阶段 {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// 从横坐标 `x` 到右边距之间的宽度
    fn width_from(&self, x: f32) -> f32 {
        self.layout.text_width_from(x)
    }

    fn title_block(&self, heading: &str, title: &str) -> Block {
        let x = self.layout.left_margin;
        Block::new(BlockKind::Heading)
            .text(x, HEADING_SIZE, FontStyle::Bold, heading, self.layout.heading_line_height)
            .paragraph(
                x,
                TITLE_SIZE,
                FontStyle::Regular,
                title,
                self.width_from(x),
                self.layout.line_height * 1.6,
            )
            .spacing(self.layout.block_spacing)
    }

    fn metadata_block(&self, generated_on: String, source: &str) -> Block {
        let x = self.layout.left_margin;
        let line = self.layout.line_height;
        Block::new(BlockKind::Metadata)
            .text(x, BODY_SIZE, FontStyle::Regular, format!("Generated on: {}", generated_on), line)
            .paragraph(
                x,
                BODY_SIZE,
                FontStyle::Regular,
                &format!("Source: {}", source),
                self.width_from(x),
                line,
            )
    }

    fn write_header(&mut self, vm: &ReportViewModel) -> AppResult<()> {
        let x = self.layout.left_margin;
        self.place(self.title_block(REPORT_HEADING, &vm.title))?;

        let mut meta = self.metadata_block(
            vm.generated_at.format("%B %-d, %Y %H:%M").to_string(),
            &vm.source_label,
        );
        if let Some(rubric) = &vm.rubric_label {
            meta = meta.paragraph(
                x,
                BODY_SIZE,
                FontStyle::Regular,
                &format!("Rubric: {}", rubric),
                self.width_from(x),
                self.layout.line_height,
            );
        }
        self.place(meta.spacing(self.layout.block_spacing * 2.0))
    }

    fn write_cognitive_header(&mut self, vm: &CognitiveViewModel) -> AppResult<()> {
        self.place(self.title_block(COGNITIVE_HEADING, &vm.title))?;
        let meta = self.metadata_block(
            vm.generated_at.format("%B %-d, %Y %H:%M").to_string(),
            &vm.source_label,
        );
        self.place(meta.spacing(self.layout.block_spacing * 2.0))
    }

    fn write_summary(&mut self, vm: &ReportViewModel) -> AppResult<()> {
        let x = self.layout.left_margin;
        let line = self.layout.line_height;
        let row = line * 1.2;

        let overall = match vm.overall_percentage() {
            Some(pct) => format!(
                "{}/{} ({}%)",
                fmt_points(vm.overall_score),
                fmt_points(vm.overall_max),
                pct
            ),
            None => "n/a".to_string(),
        };

        self.place(
            Block::new(BlockKind::OverallScore)
                .row(label_value_row(x, "Overall Score:", overall, row))
                .row(label_value_row(
                    x,
                    "Overall Complexity Score:",
                    fmt_complexity(vm.complexity_score),
                    row,
                ))
                .spacing(self.layout.block_spacing),
        )?;

        self.section_heading("Performance by Taxonomy Level:")?;
        if vm.category_breakdown.is_empty() {
            self.place(
                Block::new(BlockKind::SectionHeading)
                    .text(x + 5.0, BODY_SIZE, FontStyle::Italic, "No scored questions.", line),
            )?;
        }
        for aggregate in &vm.category_breakdown {
            let label = format!(
                "{}: {}% ({}/{})",
                aggregate.category,
                aggregate.percentage,
                fmt_points(aggregate.score_sum),
                fmt_points(aggregate.max_sum)
            );
            self.place(
                Block::new(BlockKind::CategoryProgress(aggregate.category))
                    .row(progress_row(x + 5.0, label, aggregate.percentage, line)),
            )?;
        }
        self.cursor.advance(self.layout.block_spacing);

        self.write_question_types(&vm.question_types.shares())?;

        if !vm.questions.is_empty() {
            self.section_heading("Question-wise Analysis:")?;
        }
        Ok(())
    }

    fn write_cognitive_summary(&mut self, vm: &CognitiveViewModel) -> AppResult<()> {
        let x = self.layout.left_margin;
        let line = self.layout.line_height;

        self.place(
            Block::new(BlockKind::OverallScore)
                .row(label_value_row(
                    x,
                    "Overall Complexity Score:",
                    fmt_complexity(vm.complexity_score),
                    line * 1.2,
                ))
                .spacing(self.layout.block_spacing),
        )?;

        self.section_heading("Bloom's Taxonomy Distribution:")?;
        for share in &vm.distribution {
            self.place(
                Block::new(BlockKind::DistributionShare(share.category)).row(progress_row(
                    x + 5.0,
                    format!("{}: {}%", share.category, share.percentage),
                    share.percentage,
                    line,
                )),
            )?;
        }
        self.cursor.advance(self.layout.block_spacing);

        self.write_question_types(&vm.question_types.shares())?;

        if !vm.questions.is_empty() {
            self.section_heading("Question-wise Analysis:")?;
        }
        Ok(())
    }

    fn write_question_types(&mut self, shares: &[(&'static str, usize, u32)]) -> AppResult<()> {
        self.section_heading("Question Type Distribution:")?;
        let x = self.layout.left_margin + 5.0;
        let mut types = Block::new(BlockKind::QuestionTypes);
        for (label, count, share) in shares {
            types = types.text(
                x,
                BODY_SIZE,
                FontStyle::Regular,
                format!("{}: {} ({}%)", label, count, share),
                self.layout.line_height,
            );
        }
        self.place(types.spacing(self.layout.block_spacing * 2.0))
    }

    fn question_header(&self, id: usize, label: String, prompt: &str) -> Block {
        let x = self.layout.left_margin;
        Block::new(BlockKind::QuestionHeader { question_id: id })
            .text(x, SECTION_SIZE, FontStyle::Bold, label, self.layout.line_height * 1.2)
            .paragraph(
                x + 5.0,
                BODY_SIZE,
                FontStyle::Regular,
                prompt,
                self.width_from(x + 5.0),
                self.layout.line_height,
            )
    }

    fn write_question(&mut self, question: &ScoredQuestion) -> AppResult<()> {
        let record = &question.record;
        let id = record.id;
        let x = self.layout.left_margin;
        let line = self.layout.line_height;
        let detail_width = self.width_from(x + 10.0);

        self.place(self.question_header(id, format!("Question {}:", id), &record.prompt_text))?;

        let score = match question.totals.percentage() {
            Some(pct) => format!(
                "Score: {}/{} ({}%)",
                fmt_points(question.totals.awarded),
                fmt_points(question.totals.max),
                pct
            ),
            None => format!(
                "Score: {}/{}",
                fmt_points(question.totals.awarded),
                fmt_points(question.totals.max)
            ),
        };
        self.place(
            Block::new(BlockKind::QuestionInfo { question_id: id })
                .text(x + 5.0, BODY_SIZE, FontStyle::Regular, format!("Taxonomy Level: {}", record.category), line)
                .text(x + 5.0, BODY_SIZE, FontStyle::Regular, format!("Question Type: {}", record.kind.label()), line)
                .text(x + 5.0, BODY_SIZE, FontStyle::Regular, score, line)
                .spacing(self.layout.block_spacing),
        )?;

        let answer = self.answer_block(id, &record.kind, record.answer_text.as_deref(), "Student Answer");
        self.place(answer.spacing(self.layout.block_spacing))?;

        self.place(
            Block::new(BlockKind::RubricHeading { question_id: id })
                .text(x + 5.0, BODY_SIZE, FontStyle::Bold, "Rubric Evaluation:", line),
        )?;
        for (index, criterion) in record.criteria.iter().enumerate() {
            let max = extract_max_points(&criterion.label, criterion.explicit_max);
            let text = format!(
                "{}: {}/{}",
                criterion.label,
                fmt_points(criterion.awarded),
                fmt_points(max.value)
            );
            self.place(
                Block::new(BlockKind::Criterion { question_id: id, index })
                    .paragraph(x + 10.0, BODY_SIZE, FontStyle::Regular, &text, detail_width, line),
            )?;
        }
        self.place(
            Block::new(BlockKind::CriterionTotal { question_id: id })
                .text(
                    x + 10.0,
                    BODY_SIZE,
                    FontStyle::Bold,
                    format!(
                        "Total: {}/{}",
                        fmt_points(question.totals.awarded),
                        fmt_points(question.totals.max)
                    ),
                    line,
                )
                .spacing(self.layout.block_spacing),
        )?;

        let feedback = self.feedback.feedback(&question.totals, &record.criteria);
        self.place(
            Block::new(BlockKind::Feedback { question_id: id })
                .text(x + 5.0, BODY_SIZE, FontStyle::Bold, "Feedback:", line)
                .paragraph(x + 10.0, BODY_SIZE, FontStyle::Regular, &feedback, detail_width, line)
                .spacing(self.layout.block_spacing * 3.0),
        )
    }

    fn write_analyzed_question(&mut self, question: &AnalyzedQuestion) -> AppResult<()> {
        let id = question.id;
        self.place(self.question_header(id, format!("Q{}:", id), &question.prompt_text))?;
        let levels = self.taxonomy_levels_block(id, &question.distribution);
        self.place(levels.spacing(self.layout.block_spacing * 2.0))
    }

    fn write_paper_question(&mut self, question: &AnalyzedQuestion) -> AppResult<()> {
        let id = question.id;
        let x = self.layout.left_margin + 5.0;
        let line = self.layout.line_height;

        self.place(self.question_header(id, format!("Q{}:", id), &question.prompt_text))?;

        let mut info = Block::new(BlockKind::QuestionInfo { question_id: id }).text(
            x,
            BODY_SIZE,
            FontStyle::Italic,
            format!("Type: {}", question.kind.label()),
            line,
        );
        if let Some(difficulty) = question.difficulty {
            info = info.text(
                x,
                BODY_SIZE,
                FontStyle::Italic,
                format!("Difficulty: {}", difficulty.label()),
                line,
            );
        }
        self.place(info.spacing(self.layout.block_spacing))?;

        let answer = self.answer_block(id, &question.kind, question.answer_text.as_deref(), "Answer");
        self.place(answer.spacing(self.layout.block_spacing))?;

        let levels = self.taxonomy_levels_block(id, &question.distribution);
        self.place(levels.spacing(self.layout.block_spacing * 3.0))
    }

    /// 只列出占比大于 0 的层级
    fn taxonomy_levels_block(&self, id: usize, distribution: &BloomDistribution) -> Block {
        let x = self.layout.left_margin + 5.0;
        let line = self.layout.line_height;
        let mut block = Block::new(BlockKind::TaxonomyLevels { question_id: id })
            .text(x, BODY_SIZE, FontStyle::Bold, "Bloom's Taxonomy Levels:", line);

        let mut any = false;
        for (category, share) in distribution.nonzero() {
            any = true;
            block = block.text(
                x + 5.0,
                BODY_SIZE,
                FontStyle::Regular,
                format!("{}: {}%", category, fmt_points(share)),
                line,
            );
        }
        if !any {
            block = block.text(x + 5.0, BODY_SIZE, FontStyle::Italic, "(none)", line);
        }
        block
    }

    /// 答案块：选择题列出选项并标记正确项，判断题给出答案，简答题给出作答内容
    ///
    /// `answer_label` 为作答内容的标签，例如 `Student Answer`
    fn answer_block(
        &self,
        id: usize,
        kind: &QuestionKind,
        answer_text: Option<&str>,
        answer_label: &str,
    ) -> Block {
        let x = self.layout.left_margin + 5.0;
        let line = self.layout.line_height;
        let width = self.width_from(x);
        let option_width = self.width_from(x + 5.0);
        let mut block = Block::new(BlockKind::Answer { question_id: id });

        match kind {
            QuestionKind::MultipleChoice { options, correct } => {
                block = block.text(x, BODY_SIZE, FontStyle::Bold, "Options:", line);
                for (idx, option) in options.iter().enumerate() {
                    let is_correct = correct.as_deref() == Some(option.as_str());
                    let letter = option_letter(idx);
                    let text = if is_correct {
                        format!("{}. {} (Correct)", letter, option)
                    } else {
                        format!("{}. {}", letter, option)
                    };
                    let font = if is_correct { FontStyle::Bold } else { FontStyle::Regular };
                    block = block.paragraph(x + 5.0, BODY_SIZE, font, &text, option_width, line);
                }
                if let Some(answer) = answer_text {
                    block = block.paragraph(
                        x,
                        BODY_SIZE,
                        FontStyle::Regular,
                        &format!("{}: {}", answer_label, answer),
                        width,
                        line,
                    );
                }
            }
            QuestionKind::TrueFalse { answer } => {
                let expected = match answer {
                    Some(true) => "True",
                    Some(false) => "False",
                    None => "not provided",
                };
                block = block.text(x, BODY_SIZE, FontStyle::Bold, format!("Answer: {}", expected), line);
                if let Some(student) = answer_text {
                    block = block.paragraph(
                        x,
                        BODY_SIZE,
                        FontStyle::Regular,
                        &format!("{}: {}", answer_label, student),
                        width,
                        line,
                    );
                }
            }
            QuestionKind::ShortAnswer => {
                block = block.text(x, BODY_SIZE, FontStyle::Bold, format!("{}:", answer_label), line);
                match answer_text.filter(|a| !a.trim().is_empty()) {
                    Some(answer) => {
                        block = block.paragraph(x + 5.0, BODY_SIZE, FontStyle::Regular, answer, option_width, line);
                    }
                    None => {
                        block = block.text(x + 5.0, BODY_SIZE, FontStyle::Italic, "(no answer provided)", line);
                    }
                }
            }
        }
        block
    }

    fn section_heading(&mut self, text: &str) -> AppResult<()> {
        let block = Block::new(BlockKind::SectionHeading)
            .text(
                self.layout.left_margin,
                SECTION_SIZE,
                FontStyle::Bold,
                text,
                self.layout.line_height * 1.4,
            )
            .spacing(self.layout.block_spacing);
        self.place(block)
    }

    /// 放置一个内容块：超出单页容量报错，放不下则先换页
    fn place(&mut self, block: Block) -> AppResult<()> {
        let height = block.content_height();
        let capacity = self.layout.page_capacity();
        if height > capacity {
            return Err(AppError::render_overflow(block.kind.to_string(), height, capacity));
        }

        if self.cursor.needs_break(height) && !self.cursor.at_top() {
            self.new_page();
        }

        let top = self.cursor.position();
        let mut row_top = top;
        let mut items = Vec::new();
        for row in &block.rows {
            let baseline = row_top + row.height * BASELINE_RATIO;
            for cell in &row.cells {
                items.push(match cell {
                    Cell::Text { x, size, font, text } => DrawItem::Text {
                        x: *x,
                        y: baseline,
                        size: *size,
                        font: *font,
                        text: text.clone(),
                    },
                    Cell::Bar { x, width, fill } => DrawItem::Bar {
                        x: *x,
                        y: row_top + row.height * 0.2,
                        width: *width,
                        height: row.height * 0.6,
                        fill: *fill,
                    },
                });
            }
            row_top += row.height;
        }

        self.current.push(PlacedBlock {
            kind: block.kind,
            top,
            height,
            items,
        });
        self.cursor.advance(height + block.spacing_after);
        Ok(())
    }

    fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        debug!("第 {} 页已写满，换页", number);
        self.pages.push(Page {
            number,
            blocks: std::mem::take(&mut self.current),
        });
        self.cursor.reset();
    }

    fn finish(mut self, title: &str) -> RenderedReport {
        if !self.current.is_empty() || self.pages.is_empty() {
            let number = self.pages.len() + 1;
            self.pages.push(Page {
                number,
                blocks: std::mem::take(&mut self.current),
            });
        }
        RenderedReport {
            title: title.to_string(),
            pages: self.pages,
            layout: self.layout,
        }
    }
}

fn label_value_row(x: f32, label: &str, value: String, height: f32) -> Row {
    Row {
        height,
        cells: vec![
            Cell::Text {
                x,
                size: SECTION_SIZE,
                font: FontStyle::Bold,
                text: label.to_string(),
            },
            Cell::Text {
                x: VALUE_COLUMN_X,
                size: SECTION_SIZE,
                font: FontStyle::Regular,
                text: value,
            },
        ],
    }
}

/// 标签 + 进度条
fn progress_row(x: f32, label: String, percentage: u32, height: f32) -> Row {
    Row {
        height,
        cells: vec![
            Cell::Text {
                x,
                size: BODY_SIZE,
                font: FontStyle::Regular,
                text: label,
            },
            Cell::Bar {
                x: BAR_X,
                width: BAR_WIDTH,
                fill: (percentage as f32 / 100.0).clamp(0.0, 1.0),
            },
        ],
    }
}

fn fmt_complexity(score: Option<u32>) -> String {
    score
        .map(|score| format!("{}/100", score))
        .unwrap_or_else(|| "n/a".to_string())
}

fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// 分数显示：整数不带小数，其余最多保留两位
pub fn fmt_points(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let formatted = format!("{:.2}", value);
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
