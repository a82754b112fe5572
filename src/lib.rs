//! # Bloom Report
//!
//! 把按 Bloom 认知分类标注的评分数据汇总成分页的学习分析 PDF 报告
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目记录、Bloom 分类、视图模型、数据集加载
//! - `RubricDataset` - 数据源中的原始评分数据
//! - `QuestionRecord` - 规范化后的题目（按题型区分的标签联合）
//! - `DistributionDataset` - 每题带 Bloom 分布的认知分析数据
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Aggregator` - 单题得分、分类汇总、综合复杂度
//! - `FeedbackPolicy` - 按得分率分档生成评语
//! - `ReportWriter` - 把 PDF 写入输出目录
//!
//! ### ③ 渲染层（Render）
//! - `render/` - 版式、换页状态机、PDF 编码
//! - `ReportRenderer` - 逐块放置内容，内容块不跨页；按 Helvetica 字宽换行
//!
//! ### ④ 流程层（Workflow）
//! - `ReportFlow` - 一份报告的完整流程（统计 → 渲染 → 写入）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量生成报告，控制并发
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, ReportSettings};
pub use error::{AppError, AppResult};
pub use models::{
    CognitiveViewModel, DatasetContent, DistributionDataset, QuestionRecord, ReportViewModel,
    RubricDataset,
};
pub use orchestrator::App;
pub use render::{RenderedReport, ReportRenderer};
pub use services::{Aggregator, FeedbackPolicy, ReportWriter};
pub use utils::logger;
pub use workflow::{ReportCtx, ReportFlow};
