use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::{self, TabLauncher};
use crate::config::Config;
use crate::infrastructure::{JsExecutor, JsonFileStore, SharedStore};
use crate::models::FinalReport;
use crate::orchestrator::{Orchestrator, RunPhase};
use crate::utils::logging;
use crate::workflow::OrderInspector;

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Arc<Browser>,
    orchestrator: Orchestrator,
}

impl App {
    /// 初始化应用：报告文件、浏览器连接、共享存储
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.batch_size);

        let (browser, page) =
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
                .await?;
        let browser = Arc::new(browser);

        let store: Arc<dyn SharedStore> = Arc::new(JsonFileStore::open(&config.store_path).await?);
        info!("💾 共享存储: {}", config.store_path);

        let inspector = Arc::new(OrderInspector::new(store.clone(), &config));
        let launcher = Arc::new(TabLauncher::new(browser.clone(), inspector));
        let listing = Arc::new(JsExecutor::new(page));
        let orchestrator = Orchestrator::new(store, listing, launcher, config.clone());

        Ok(Self {
            config,
            _browser: browser,
            orchestrator,
        })
    }

    /// 运行一次完整检查，批次之间由操作员在终端确认
    pub async fn run(&mut self) -> Result<FinalReport> {
        info!("⏳ 等待订单列表页加载...");
        sleep(self.config.list_settle()).await;

        let mut operator = BufReader::new(tokio::io::stdin()).lines();
        let mut phase = self.orchestrator.start_run().await?;

        let report = loop {
            match phase {
                RunPhase::Finalized(report) => break report,
                RunPhase::AwaitingNextBatch {
                    completed_batches,
                    total_batches,
                    next_batch_size,
                } => {
                    if prompt_next_batch(&mut operator, completed_batches, total_batches, next_batch_size).await? {
                        phase = self.orchestrator.run_next_batch().await?;
                    } else {
                        warn!("⚠️ 操作员提前结束检查");
                        break self.orchestrator.finalize();
                    }
                }
            }
        };

        logging::append_report(&self.config.output_log_file, &report)?;
        Ok(report)
    }
}

/// 询问操作员是否继续；回车继续，输入 q 或输入结束则停止
async fn prompt_next_batch(
    operator: &mut Lines<BufReader<Stdin>>,
    completed_batches: usize,
    total_batches: usize,
    next_batch_size: usize,
) -> Result<bool> {
    info!(
        "✋ 已完成 {}/{} 批。按回车开始下一批 ({} 个订单)，输入 q 结束:",
        completed_batches, total_batches, next_batch_size
    );
    Ok(match operator.next_line().await? {
        Some(line) => !line.trim().eq_ignore_ascii_case("q"),
        None => false,
    })
}
