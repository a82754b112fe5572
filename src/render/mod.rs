pub mod layout;
pub mod metrics;
pub mod pdf;
pub mod renderer;

pub use layout::{
    wrap_text, Block, BlockKind, DrawItem, FontStyle, LayoutConfig, Page, PageCursor, PlacedBlock,
};
pub use metrics::text_width_mm;
pub use pdf::encode_text;
pub use renderer::{fmt_points, RenderedReport, ReportRenderer, COGNITIVE_HEADING, REPORT_HEADING};
