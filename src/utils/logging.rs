//! 日志工具模块
//!
//! 控制台日志初始化、运行日志文件和各阶段的横幅输出。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchSummary, DateRange, DownloadResult};

/// 初始化控制台日志
///
/// `RUST_LOG` 优先；否则 `verbose` 时为 debug，默认 info。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},chromiumoxide=warn", default_level).into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 初始化运行日志文件（覆盖旧内容）
pub fn init_log_file(log_file_path: impl AsRef<Path>) -> Result<()> {
    let path = log_file_path.as_ref();
    let log_header = format!(
        "{}\nNF-e 下载日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(path, log_header).with_context(|| format!("无法写入日志文件: {}", path.display()))?;
    Ok(())
}

/// 追加一行到运行日志文件
pub fn append_log_line(log_file_path: impl AsRef<Path>, line: &str) -> Result<()> {
    let path = log_file_path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("无法打开日志文件: {}", path.display()))?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// 把一次查询的结果写入运行日志
pub fn record_result(log_file_path: impl AsRef<Path>, result: &DownloadResult) -> Result<()> {
    let mut line = format!(
        "[{}] IE {} | {} | {} 个文件",
        chrono::Local::now().format("%H:%M:%S"),
        result.entity_id(),
        result.category(),
        result.files().len()
    );
    for file in result.files() {
        line.push_str(&format!("\n    {}", file.display()));
    }
    append_log_line(log_file_path, &line)
}

pub fn log_startup(config: &Config, entities: usize, range: &DateRange) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - SEFAZ-GO NF-e 批量下载");
    match config.browser_debug_port {
        Some(port) => info!("🔌 连接已有浏览器，调试端口: {}", port),
        None => info!("🌐 启动新浏览器 (headless: {})", config.headless),
    }
    info!("📋 IE 数量: {}", entities);
    info!("📅 日期范围: {} - {}", range.start_text(), range.end_text());
    info!("📁 下载目录: {}", config.download_dir.display());
    info!("{}", "=".repeat(60));
}

pub fn log_entity_start(index: usize, total: usize, entity_id: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 开始处理第 {}/{} 个 IE: {}", index, total, entity_id);
    info!("{}", "─".repeat(60));
}

pub fn log_entity_complete(entity_id: &str, files: usize) {
    info!("✓ IE {} 完成，共 {} 个文件", entity_id, files);
}

pub fn print_final_stats(summary: &BatchSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 查询: {} 次", summary.results().len());
    info!("📥 文件: {} 个", summary.file_count());
    info!("❌ 失败 IE: {}", summary.failures().len());
    for failure in summary.failures() {
        info!("   - {}: {}", failure.entity_id, failure.reason);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}
