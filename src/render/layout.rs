//! 版式基础：页面参数、纵向游标、自动换行、内容块
//!
//! 所有长度单位为毫米，纵坐标从页面顶部向下增长

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::BloomCategory;
use crate::render::metrics::{char_units, mm_to_units, text_units};

/// 正文区域的最小宽度（毫米）
const MIN_TEXT_WIDTH: f32 = 40.0;

/// 页面版式参数
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    /// 每页起始游标位置
    pub top_margin: f32,
    /// 游标允许到达的最低位置（内容块底部不能超过它）
    pub usable_height: f32,
    pub left_margin: f32,
    /// 文本右侧不能越过 `page_width - right_margin`
    pub right_margin: f32,
    /// 正文行高
    pub line_height: f32,
    /// 一级标题行高
    pub heading_line_height: f32,
    /// 内容块之间的间距
    pub block_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            top_margin: 20.0,
            usable_height: 280.0,
            left_margin: 20.0,
            right_margin: 20.0,
            line_height: 5.0,
            heading_line_height: 10.0,
            block_spacing: 3.0,
        }
    }
}

impl LayoutConfig {
    /// 单页可容纳的最大内容高度
    pub fn page_capacity(&self) -> f32 {
        self.usable_height - self.top_margin
    }

    /// 从横坐标 `x` 开始可用的文本宽度
    pub fn text_width_from(&self, x: f32) -> f32 {
        self.page_width - self.right_margin - x
    }

    pub(crate) fn validate(&self) -> AppResult<()> {
        if !(self.top_margin >= 0.0
            && self.top_margin < self.usable_height
            && self.usable_height <= self.page_height)
        {
            return Err(AppError::invalid_config(
                "layout",
                "需要满足 0 <= top_margin < usable_height <= page_height",
            ));
        }
        if self.line_height <= 0.0 || self.heading_line_height <= 0.0 || self.block_spacing < 0.0 {
            return Err(AppError::invalid_config("layout", "行高必须为正数"));
        }
        if self.left_margin < 0.0
            || self.right_margin < 0.0
            || self.page_width - self.left_margin - self.right_margin < MIN_TEXT_WIDTH
        {
            return Err(AppError::invalid_config(
                "layout",
                format!("左右边距之间至少要留 {} 毫米", MIN_TEXT_WIDTH),
            ));
        }
        Ok(())
    }
}

/// 纵向游标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    top_margin: f32,
    usable_height: f32,
    position: f32,
}

impl PageCursor {
    pub fn new(top_margin: f32, usable_height: f32) -> Self {
        Self {
            top_margin,
            usable_height,
            position: top_margin,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// 写入高度为 `height` 的内容块之前是否需要换页
    pub fn needs_break(&self, height: f32) -> bool {
        self.position + height > self.usable_height
    }

    /// 当前页是否还没有写入任何内容
    pub fn at_top(&self) -> bool {
        self.position <= self.top_margin
    }

    pub fn advance(&mut self, height: f32) {
        self.position += height;
    }

    pub fn reset(&mut self) {
        self.position = self.top_margin;
    }
}

/// 按实际字宽贪心换行
///
/// 优先在空白处断行；比整行还宽的单词按字符切开，不丢字符
///
/// # 参数
/// - `size`: 字号（pt）
/// - `max_width`: 可用宽度（毫米）
pub fn wrap_text(text: &str, font: FontStyle, size: f32, max_width: f32) -> Vec<String> {
    let limit = mm_to_units(max_width, size);
    let space = text_units(" ", font);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_units = 0;

    for word in text.split_whitespace() {
        let word_units = text_units(word, font);
        if !current.is_empty() && (current_units + space + word_units) as f32 <= limit {
            current.push(' ');
            current.push_str(word);
            current_units += space + word_units;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_units = 0;
        }

        if word_units as f32 <= limit {
            current.push_str(word);
            current_units = word_units;
            continue;
        }

        for c in word.chars() {
            let units = char_units(c, font);
            if !current.is_empty() && (current_units + units) as f32 > limit {
                lines.push(std::mem::take(&mut current));
                current_units = 0;
            }
            current.push(c);
            current_units += units;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// 字体样式（对应 Helvetica 三种字形）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// 内容块类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Metadata,
    OverallScore,
    SectionHeading,
    CategoryProgress(BloomCategory),
    QuestionTypes,
    /// 整体 Bloom 分布中的一个分类
    DistributionShare(BloomCategory),
    /// 按题型分组的小标题
    GroupHeading,
    QuestionHeader { question_id: usize },
    QuestionInfo { question_id: usize },
    Answer { question_id: usize },
    TaxonomyLevels { question_id: usize },
    RubricHeading { question_id: usize },
    Criterion { question_id: usize, index: usize },
    CriterionTotal { question_id: usize },
    Feedback { question_id: usize },
}

impl BlockKind {
    /// 所属题目（摘要部分的块返回 `None`）
    pub fn question_id(&self) -> Option<usize> {
        match self {
            BlockKind::QuestionHeader { question_id }
            | BlockKind::QuestionInfo { question_id }
            | BlockKind::Answer { question_id }
            | BlockKind::TaxonomyLevels { question_id }
            | BlockKind::RubricHeading { question_id }
            | BlockKind::Criterion { question_id, .. }
            | BlockKind::CriterionTotal { question_id }
            | BlockKind::Feedback { question_id } => Some(*question_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockKind::Heading => write!(f, "标题"),
            BlockKind::Metadata => write!(f, "报告信息"),
            BlockKind::OverallScore => write!(f, "总分"),
            BlockKind::SectionHeading => write!(f, "小节标题"),
            BlockKind::CategoryProgress(category) => write!(f, "分类 {}", category),
            BlockKind::QuestionTypes => write!(f, "题型分布"),
            BlockKind::DistributionShare(category) => write!(f, "分布 {}", category),
            BlockKind::GroupHeading => write!(f, "题型分组标题"),
            BlockKind::QuestionHeader { question_id } => write!(f, "题目 {} 题干", question_id),
            BlockKind::QuestionInfo { question_id } => write!(f, "题目 {} 信息", question_id),
            BlockKind::Answer { question_id } => write!(f, "题目 {} 答案", question_id),
            BlockKind::TaxonomyLevels { question_id } => {
                write!(f, "题目 {} 认知层级", question_id)
            }
            BlockKind::RubricHeading { question_id } => write!(f, "题目 {} 评分表头", question_id),
            BlockKind::Criterion { question_id, index } => {
                write!(f, "题目 {} 评分项 {}", question_id, index + 1)
            }
            BlockKind::CriterionTotal { question_id } => write!(f, "题目 {} 合计", question_id),
            BlockKind::Feedback { question_id } => write!(f, "题目 {} 评语", question_id),
        }
    }
}

/// 行内元素
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text {
        x: f32,
        size: f32,
        font: FontStyle,
        text: String,
    },
    /// 进度条，`fill` 取值 0..=1
    Bar { x: f32, width: f32, fill: f32 },
}

/// 一行内容
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub height: f32,
    pub cells: Vec<Cell>,
}

/// 内容块：换页判断的最小单位，不会被拆到两页
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub rows: Vec<Row>,
    pub spacing_after: f32,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            spacing_after: 0.0,
        }
    }

    /// 追加一行单段文本
    pub fn text(
        mut self,
        x: f32,
        size: f32,
        font: FontStyle,
        text: impl Into<String>,
        height: f32,
    ) -> Self {
        self.rows.push(Row {
            height,
            cells: vec![Cell::Text {
                x,
                size,
                font,
                text: text.into(),
            }],
        });
        self
    }

    /// 追加自动换行的段落，每行一个 row
    ///
    /// `max_width` 为可用宽度（毫米）
    pub fn paragraph(
        mut self,
        x: f32,
        size: f32,
        font: FontStyle,
        text: &str,
        max_width: f32,
        line_height: f32,
    ) -> Self {
        for line in wrap_text(text, font, size, max_width) {
            self = self.text(x, size, font, line, line_height);
        }
        self
    }

    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn spacing(mut self, spacing_after: f32) -> Self {
        self.spacing_after = spacing_after;
        self
    }

    /// 内容高度（不含块后间距）
    pub fn content_height(&self) -> f32 {
        self.rows.iter().map(|r| r.height).sum()
    }
}

/// 已定位的绘制元素（绝对坐标，y 为基线）
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: FontStyle,
        text: String,
    },
    Bar {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: f32,
    },
}

/// 已定位的内容块
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    pub top: f32,
    pub height: f32,
    pub items: Vec<DrawItem>,
}

impl PlacedBlock {
    /// 块内所有文本，按行以换行符连接
    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                DrawItem::Text { text, .. } => Some(text.as_str()),
                DrawItem::Bar { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 一页内容
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<PlacedBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::metrics::text_width_mm;

    #[test]
    fn test_page_break_example() {
        let mut cursor = PageCursor::new(20.0, 250.0);
        cursor.advance(225.0);
        assert_eq!(cursor.position(), 245.0);
        assert!(cursor.needs_break(20.0));
        assert!(!cursor.needs_break(5.0));

        cursor.reset();
        assert!(cursor.at_top());
        assert!(!cursor.needs_break(20.0));
    }

    fn fits(lines: &[String], font: FontStyle, size: f32, max_width: f32) -> bool {
        lines
            .iter()
            .all(|line| text_width_mm(line, font, size) <= max_width + 1e-3)
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "Designers can use detailed avatars for personal presence and voice chat for social presence";
        let lines = wrap_text(text, FontStyle::Regular, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert!(fits(&lines, FontStyle::Regular, 10.0, 50.0), "{:?}", lines);
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wide_glyphs_wrap_earlier() {
        let wide = vec!["WWWWWWWWW"; 20].join(" ");
        let narrow = vec!["iiiiiiiii"; 20].join(" ");

        let wide_lines = wrap_text(&wide, FontStyle::Regular, 10.0, 170.0);
        let narrow_lines = wrap_text(&narrow, FontStyle::Regular, 10.0, 170.0);

        assert!(wide_lines.len() > narrow_lines.len());
        assert!(fits(&wide_lines, FontStyle::Regular, 10.0, 170.0));
        assert_eq!(wide_lines.join(" "), wide);
    }

    #[test]
    fn test_bold_text_is_measured_with_bold_widths() {
        let text = vec!["interpretation"; 12].join(" ");
        let regular = wrap_text(&text, FontStyle::Regular, 10.0, 80.0);
        let bold = wrap_text(&text, FontStyle::Bold, 10.0, 80.0);
        assert!(fits(&bold, FontStyle::Bold, 10.0, 80.0));
        assert!(bold.len() >= regular.len());
    }

    #[test]
    fn test_wrap_splits_words_wider_than_the_line() {
        let text = "see https://example.com/a/very/long/path/segment now";
        let lines = wrap_text(text, FontStyle::Regular, 10.0, 20.0);

        assert_eq!(lines[0], "see");
        assert!(lines.len() > 3);
        assert!(fits(&lines, FontStyle::Regular, 10.0, 20.0), "{:?}", lines);
        assert_eq!(lines.concat().replace(' ', ""), text.replace(' ', ""));
    }

    #[test]
    fn test_wrap_collapses_whitespace() {
        assert_eq!(
            wrap_text("  a \n\n b\tc  ", FontStyle::Regular, 10.0, 170.0),
            vec!["a b c"]
        );
        assert!(wrap_text("   ", FontStyle::Regular, 10.0, 170.0).is_empty());
    }

    #[test]
    fn test_block_height_excludes_spacing() {
        let block = Block::new(BlockKind::Heading)
            .text(20.0, 18.0, FontStyle::Bold, "Report", 10.0)
            .paragraph(20.0, 10.0, FontStyle::Regular, "one two three", 15.0, 5.0)
            .spacing(4.0);
        assert_eq!(block.rows.len(), 3);
        assert_eq!(block.content_height(), 20.0);
    }

    #[test]
    fn test_default_layout_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
        let broken = LayoutConfig {
            top_margin: 300.0,
            ..LayoutConfig::default()
        };
        assert!(broken.validate().is_err());
        let narrow = LayoutConfig {
            left_margin: 90.0,
            right_margin: 90.0,
            ..LayoutConfig::default()
        };
        assert!(narrow.validate().is_err());
        assert_eq!(LayoutConfig::default().text_width_from(30.0), 160.0);
    }
}
