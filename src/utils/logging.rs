use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供运行日志文件和统计输出的辅助函数
use std::fs;
use tracing::info;

/// 运行统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 初始化日志文件，写入带时间戳的表头
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n报告生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, output_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量生成学习分析报告");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("📂 输出目录: {}", output_dir);
    info!("{}", "=".repeat(60));
}

/// 记录数据集加载信息
pub fn log_datasets_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的数据集", total);
    info!("📋 最多同时生成 {} 份报告\n", max_concurrent);
}

/// 追加一行到运行日志文件
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &RunStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
