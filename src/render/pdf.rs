//! PDF 编码：把已分页的内容写成 PDF 字节
//!
//! 只使用 PDF 内置的 Helvetica 字体，不嵌入字体文件。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{AppError, AppResult, RenderError};
use crate::render::layout::{DrawItem, FontStyle, LayoutConfig, Page};
use crate::render::renderer::RenderedReport;

/// 毫米转换为 PDF 点
pub(crate) const MM_TO_PT: f32 = 72.0 / 25.4;

const PRODUCER: &str = concat!("bloom_report ", env!("CARGO_PKG_VERSION"));

/// 进度条底色与填充色（RGB 0..1）
const BAR_TRACK: [f32; 3] = [0.9, 0.9, 0.9];
const BAR_FILL: [f32; 3] = [0.26, 0.52, 0.96];

fn font_resource(font: FontStyle) -> &'static str {
    match font {
        FontStyle::Regular => "F1",
        FontStyle::Bold => "F2",
        FontStyle::Italic => "F3",
    }
}

fn pdf_error(err: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Render(RenderError::PdfEncode {
        source: Box::new(err),
    })
}

/// 单个字符的 WinAnsi 码位
///
/// 常见的排版符号映射到对应码位，其余非 Latin-1 字符替换为 `?`
pub(crate) fn encode_char(c: char) -> u8 {
    match c {
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2026}' => 0x85,
        '\u{20AC}' => 0x80,
        '\t' | '\n' | '\r' => b' ',
        c if (c as u32) < 0x80 && !c.is_control() => c as u8,
        c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
        _ => b'?',
    }
}

/// 把文本转换为 WinAnsi 编码
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

/// 纵坐标从页顶向下（毫米）转换为 PDF 坐标（点，从页底向上）
fn to_pdf_y(layout: &LayoutConfig, y_mm: f32) -> f32 {
    (layout.page_height - y_mm) * MM_TO_PT
}

fn page_operations(layout: &LayoutConfig, page: &Page) -> Vec<Operation> {
    let mut ops = Vec::new();

    for block in &page.blocks {
        for item in &block.items {
            match item {
                DrawItem::Text {
                    x,
                    y,
                    size,
                    font,
                    text,
                } => {
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new(
                        "Tf",
                        vec![font_resource(*font).into(), (*size).into()],
                    ));
                    ops.push(Operation::new(
                        "Td",
                        vec![(x * MM_TO_PT).into(), to_pdf_y(layout, *y).into()],
                    ));
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(encode_text(text))],
                    ));
                    ops.push(Operation::new("ET", vec![]));
                }
                DrawItem::Bar {
                    x,
                    y,
                    width,
                    height,
                    fill,
                } => {
                    let left = x * MM_TO_PT;
                    let bottom = to_pdf_y(layout, y + height);
                    let full = width * MM_TO_PT;
                    let tall = height * MM_TO_PT;

                    ops.push(Operation::new("q", vec![]));
                    ops.push(rgb(BAR_TRACK));
                    ops.push(Operation::new(
                        "re",
                        vec![left.into(), bottom.into(), full.into(), tall.into()],
                    ));
                    ops.push(Operation::new("f", vec![]));
                    if *fill > 0.0 {
                        ops.push(rgb(BAR_FILL));
                        ops.push(Operation::new(
                            "re",
                            vec![
                                left.into(),
                                bottom.into(),
                                (full * fill.clamp(0.0, 1.0)).into(),
                                tall.into(),
                            ],
                        ));
                        ops.push(Operation::new("f", vec![]));
                    }
                    ops.push(Operation::new("Q", vec![]));
                }
            }
        }
    }
    ops
}

fn rgb(color: [f32; 3]) -> Operation {
    Operation::new(
        "rg",
        vec![color[0].into(), color[1].into(), color[2].into()],
    )
}

fn add_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// 把渲染结果编码为 PDF
pub fn encode_pdf(report: &RenderedReport) -> AppResult<Vec<u8>> {
    let layout = report.layout();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = add_font(&mut doc, "Helvetica");
    let bold = add_font(&mut doc, "Helvetica-Bold");
    let italic = add_font(&mut doc, "Helvetica-Oblique");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(report.pages.len());
    for page in &report.pages {
        let content = Content {
            operations: page_operations(layout, page),
        };
        let encoded = content.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (layout.page_width * MM_TO_PT).into(),
            (layout.page_height * MM_TO_PT).into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_text(&report.title)),
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}
