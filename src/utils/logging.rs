/// 日志工具模块
///
/// 提供日志初始化、报告文件和批次横幅的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::FinalReport;

/// 初始化 tracing 日志，默认 info 级别，可用 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化报告文件
///
/// # 参数
/// - `log_file_path`: 报告文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nGST 检查报告 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `batch_size`: 每批订单数
pub fn log_startup(batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 分批 GST 检查模式");
    info!("📊 每批订单数: {}", batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录订单发现结果
pub fn log_orders_loaded(mapped: usize, seen: usize, batch_size: usize) {
    info!("✓ 共找到 {} 个订单，成功解析 {} 个", seen, mapped);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("💡 每批完成后需要手动开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（从 1 开始）
/// - `total_batches`: 批次总数
/// - `start`: 起始订单编号
/// - `end`: 结束订单编号
/// - `total`: 订单总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批订单: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, dispatched: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: {} 个订单已有结论", batch_num, dispatched);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &FinalReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 GST 检查完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for line in report.to_string().lines() {
        info!("{}", line);
    }
    info!("{}", "=".repeat(60));
    if report.batches_outstanding {
        warn!("⚠️ 检查提前结束，仍有批次未处理，请查看日志");
    }
}

/// 把最终报告追加到报告文件
pub fn append_report(log_file_path: &str, report: &FinalReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "完成时间: {}\n{}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        report
    )?;
    info!("\n报告已保存至: {}", log_file_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, SessionResults};

    #[test]
    fn test_report_file_contains_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        let report = FinalReport {
            results: SessionResults {
                total_orders: 3,
                processed: 3,
                errors: 1,
                discrepancies: 1,
                total_overcharge_value: Money::new(0.4),
            },
            successes: 2,
            batches_outstanding: false,
        };
        append_report(path, &report).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("GST 检查报告"));
        assert!(content.contains("检查成功: 2"));
        assert!(content.contains("AU$0.40"));
    }
}
