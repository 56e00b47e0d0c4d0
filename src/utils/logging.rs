//! 日志工具模块
//!
//! 基于 tracing 的日志初始化与批处理过程的格式化输出

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 默认 info 级别，可通过 RUST_LOG 环境变量调整
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
pub fn log_startup(max_workers: usize, model_id: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 自动化习题解析批处理模式");
    info!("📊 最大并发数: {}", max_workers);
    info!("🤖 模型ID: {}", model_id);
    info!("{}", "=".repeat(60));
}

/// 记录任务加载信息
pub fn log_problems_loaded(total: usize, max_workers: usize) {
    info!("✓ 共加载 {} 个待处理题目", total);
    info!("📋 将以最多 {} 个并发处理\n", max_workers);
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}
