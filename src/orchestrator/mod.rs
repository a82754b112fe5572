//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和调度，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量报告处理器
//! - 管理应用生命周期（初始化、运行）
//! - 加载数据集（输入目录 / 远程 / 内置样例）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<NamedDataset>)
//!     ↓
//! workflow::ReportFlow (处理单个数据集)
//!     ↓
//! services (能力层：aggregator / feedback / report_writer)
//!     ↓
//! render (版式与 PDF 编码)
//! ```

pub mod batch_processor;

pub use batch_processor::App;
