//! Helvetica 字宽表（AFM，1/1000 em）
//!
//! 换行按实际字宽计算，与 PDF 中绘制的字体一致。
//! Oblique 与 Regular 字宽相同。

use crate::render::layout::FontStyle;
use crate::render::pdf::{encode_char, MM_TO_PT};

/// Helvetica，WinAnsi 0x20..=0x7E
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

/// Helvetica-Bold，WinAnsi 0x20..=0x7E
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// WinAnsi 高位码的字宽，取两种字重中较宽的一个
fn high_byte_width(byte: u8) -> u16 {
    match byte {
        0x85 | 0x97 | 0xC6 => 1000,
        0x91 | 0x92 => 278,
        0x93 | 0x94 => 500,
        0x95 => 350,
        0x80 | 0x96 => 556,
        0xE6 => 889,
        0xBC..=0xBE => 834,
        0xC0..=0xDF => 778,
        0xE0..=0xFF => 611,
        _ => 737,
    }
}

/// 单个 WinAnsi 字节的字宽
pub fn glyph_width(byte: u8, font: FontStyle) -> u16 {
    match byte {
        0x20..=0x7E => {
            let idx = usize::from(byte - 0x20);
            match font {
                FontStyle::Bold => HELVETICA_BOLD[idx],
                FontStyle::Regular | FontStyle::Italic => HELVETICA[idx],
            }
        }
        _ => high_byte_width(byte),
    }
}

/// 单个字符的字宽（按编码后的字节计算）
pub fn char_units(c: char, font: FontStyle) -> u32 {
    u32::from(glyph_width(encode_char(c), font))
}

/// 文本宽度（1/1000 em）
pub fn text_units(text: &str, font: FontStyle) -> u32 {
    text.chars().map(|c| char_units(c, font)).sum()
}

/// 字宽单位换算为毫米
pub fn units_to_mm(units: u32, size: f32) -> f32 {
    units as f32 * size / 1000.0 / MM_TO_PT
}

/// 毫米换算为字宽单位
pub fn mm_to_units(width: f32, size: f32) -> f32 {
    width * MM_TO_PT * 1000.0 / size
}

/// 文本在指定字号下的宽度（毫米）
pub fn text_width_mm(text: &str, font: FontStyle, size: f32) -> f32 {
    units_to_mm(text_units(text, font), size)
}
