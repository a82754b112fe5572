//! 日志初始化
//!
//! 使用 `tracing-subscriber`，`RUST_LOG` 优先；未设置时默认 `info`，详细模式为 `debug`

use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 重复调用不会 panic（测试中可能被多次调用）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
