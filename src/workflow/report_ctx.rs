//! 报告处理上下文
//!
//! 封装"我正在生成第几份报告、数据来自哪里"这一信息

use std::fmt::Display;

/// 报告处理上下文
#[derive(Debug, Clone)]
pub struct ReportCtx {
    /// 数据集名称（文件名去掉扩展名）
    pub dataset_name: String,

    /// 报告序号（从1开始，仅用于日志显示）
    pub report_index: usize,

    /// 报告中显示的数据来源
    pub source_label: String,
}

impl ReportCtx {
    pub fn new(
        dataset_name: impl Into<String>,
        report_index: usize,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            report_index,
            source_label: source_label.into(),
        }
    }
}

impl Display for ReportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[报告 #{} 数据集 {}]", self.report_index, self.dataset_name)
    }
}
