//! 批量报告处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量生成报告和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志表头、加载报告设置
//! 2. **数据加载**：扫描输入目录；目录为空时改用远程数据或内置样例
//! 3. **并发控制**：使用 Semaphore 限制同时渲染的报告数
//! 4. **全局统计**：汇总所有报告的生成结果
//!
//! 单个数据集失败只计入失败数，不会中断其他报告。

use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::RubricClient;
use crate::config::{Config, ReportSettings};
use crate::error::{AppError, FileError};
use crate::models::fallback::FALLBACK_SOURCE_LABEL;
use crate::models::{fallback_dataset, load_all_datasets, NamedDataset};
use crate::services::ReportWriter;
use crate::utils::logging::{
    append_log_line, init_log_file, log_datasets_loaded, log_startup, print_final_stats,
};
use crate::utils::{truncate_text, RunStats};
use crate::workflow::{ReportCtx, ReportFlow};

/// 没有输入文件时使用的数据集名称
const DEFAULT_DATASET_NAME: &str = "rubric-analysis";

/// 待处理的报告任务
struct ReportJob {
    dataset: NamedDataset,
    source_label: String,
}

/// 应用主结构
pub struct App {
    config: Config,
    settings: Arc<ReportSettings>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(config.max_concurrent_reports, &config.output_dir);

        let settings = config
            .load_report_settings()
            .context("加载报告设置失败")?;
        if let Some(path) = &config.report_settings_path {
            info!("⚙️ 已加载报告设置: {}", path);
        }

        Ok(Self {
            config,
            settings: Arc::new(settings),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let jobs = self.load_jobs().await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有可生成的报告，程序结束");
            return Ok(RunStats::default());
        }

        log_datasets_loaded(jobs.len(), self.config.max_concurrent_reports);

        let stats = self.process_all(jobs).await?;
        print_final_stats(&stats, &self.config.output_log_file);

        Ok(stats)
    }

    /// 加载数据集；输入目录缺失或为空时改用远程数据 / 内置样例
    async fn load_jobs(&self) -> Result<Vec<ReportJob>> {
        info!("\n📁 正在扫描输入目录: {}", self.config.input_folder);

        let datasets = match load_all_datasets(&self.config.input_folder).await {
            Ok(datasets) => datasets,
            Err(AppError::File(FileError::DirectoryNotFound { path })) => {
                warn!("⚠️ 输入目录不存在: {}", path);
                Vec::new()
            }
            Err(e) => return Err(e).context("扫描输入目录失败"),
        };

        if !datasets.is_empty() {
            return Ok(datasets
                .into_iter()
                .map(|dataset| {
                    let source_label = dataset
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dataset.name.clone());
                    ReportJob {
                        dataset,
                        source_label,
                    }
                })
                .collect());
        }

        let job = match &self.config.rubric_source_url {
            Some(url) => {
                info!("🌐 输入目录为空，从远程拉取评分数据: {}", url);
                let client = RubricClient::new(url.as_str());
                let (dataset, remote) = client.fetch_or_fallback().await;
                ReportJob {
                    dataset: NamedDataset::new(DEFAULT_DATASET_NAME, dataset),
                    source_label: if remote {
                        url.clone()
                    } else {
                        FALLBACK_SOURCE_LABEL.to_string()
                    },
                }
            }
            None => {
                warn!("⚠️ 输入目录为空且未配置 RUBRIC_SOURCE_URL，使用内置样例数据");
                ReportJob {
                    dataset: NamedDataset::new(DEFAULT_DATASET_NAME, fallback_dataset()),
                    source_label: FALLBACK_SOURCE_LABEL.to_string(),
                }
            }
        };
        Ok(vec![job])
    }

    /// 并发生成所有报告
    async fn process_all(&self, jobs: Vec<ReportJob>) -> Result<RunStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_reports));
        let flow = Arc::new(ReportFlow::new(
            &self.settings,
            ReportWriter::new(&self.config.output_dir),
            self.config.rubric_label.clone(),
        )
        .with_question_paper(self.config.export_question_paper));
        let total = jobs.len();

        let mut handles = Vec::with_capacity(total);
        for (idx, job) in jobs.into_iter().enumerate() {
            let report_index = idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = flow.clone();
            let ctx = ReportCtx::new(job.dataset.name.clone(), report_index, job.source_label);

            info!(
                "{} 🔄 开始生成: {}",
                ctx,
                truncate_text(&job.dataset.title(), 40)
            );

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(job.dataset, &ctx).await;
                if let Err(e) = &result {
                    error!("{} ❌ 报告生成失败: {}", ctx, e);
                }
                (ctx, result)
            });
            handles.push((report_index, handle));
        }

        let (indices, futures): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(futures).await;

        let mut stats = RunStats {
            total,
            ..Default::default()
        };
        for (report_index, joined) in indices.into_iter().zip(results) {
            let line = match joined {
                Ok((ctx, Ok(outcome))) => {
                    stats.success += 1;
                    let paths: Vec<String> = outcome
                        .paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    format!("{} ✓ {}", ctx, paths.join(", "))
                }
                Ok((ctx, Err(e))) => {
                    stats.failed += 1;
                    format!("{} ✗ {}", ctx, e)
                }
                Err(e) => {
                    error!("[报告 #{}] 任务执行失败: {}", report_index, e);
                    stats.failed += 1;
                    format!("[报告 #{}] ✗ 任务执行失败: {}", report_index, e)
                }
            };
            if let Err(e) = append_log_line(&self.config.output_log_file, &line) {
                warn!("⚠️ 写入日志文件失败: {}", e);
            }
        }

        Ok(stats)
    }
}
