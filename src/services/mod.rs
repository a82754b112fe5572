pub mod aggregator;
pub mod feedback;
pub mod report_writer;

pub use aggregator::{
    aggregate_by_category, compute_question_totals, extract_max_points, overall_distribution,
    Aggregator, MaxPoints,
};
pub use feedback::{FeedbackPolicy, FeedbackTier};
pub use report_writer::{report_file_name, slugify, ReportWriter};
