//! 分批检查流程测试
//!
//! 用内存存储、假列表页和假标签页驱动真实的 `Orchestrator` 与 `OrderInspector`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gst_checker::config::Selectors;
use gst_checker::error::{AppError, AppResult, CoordinationError, DiscoveryError};
use gst_checker::infrastructure::{OrderListing, PageDom, ViewLauncher};
use gst_checker::models::{Money, OrderEntry, PriceRow};
use gst_checker::services::order_discovery::order_id_from_locator;
use gst_checker::{Config, MemoryStore, OrderInspector, Orchestrator, RunPhase, RunState, SharedStore};
use serde_json::{json, Value as JsonValue};
use url::Url;

const LIST_URL: &str = "https://www.aliexpress.com/p/order/index.html";

fn fast_config(batch_size: usize) -> Config {
    Config {
        batch_size,
        dispatch_delay_ms: 0,
        element_timeout_ms: 50,
        wait_interval_ms: 1,
        poll_interval_ms: 5,
        worker_timeout_ms: 150,
        worker_start_delay_ms: 0,
        render_settle_ms: 0,
        close_grace_ms: 0,
        ..Config::default()
    }
}

// ========== 假列表页 ==========

struct FakeListing {
    entries: Vec<OrderEntry>,
}

impl FakeListing {
    fn with_orders(count: usize) -> Self {
        Self {
            entries: (1..=count).map(order_entry).collect(),
        }
    }
}

fn order_entry(n: usize) -> OrderEntry {
    OrderEntry {
        info_lines: vec![format!("Order date: Mar {}, 2024", n), format!("Order ID: {}", n)],
        detail_href: Some(format!("/p/order/detail.html?orderId={}", n)),
    }
}

#[async_trait]
impl OrderListing for FakeListing {
    async fn base_url(&self) -> AppResult<Url> {
        Ok(Url::parse(LIST_URL).unwrap())
    }

    async fn order_entries(&self, _selectors: &Selectors) -> AppResult<Vec<OrderEntry>> {
        Ok(self.entries.clone())
    }
}

// ========== 假详情页 ==========

/// 偶数订单多收税，奇数订单正常
struct FakeDetailPage {
    url: String,
    rows: Vec<PriceRow>,
}

impl FakeDetailPage {
    fn for_order(locator: &Url, order_id: &str) -> Self {
        let even = order_id.parse::<u64>().map(|n| n % 2 == 0).unwrap_or(false);
        let tax = if even { "AU$11.00" } else { "AU$9.00" };
        Self {
            url: locator.to_string(),
            rows: vec![
                PriceRow::new("Subtotal", "AU$100.00"),
                PriceRow::new("Shipping", "Free shipping"),
                PriceRow::new("Tax", tax),
            ],
        }
    }
}

#[async_trait]
impl PageDom for FakeDetailPage {
    async fn current_url(&self) -> AppResult<String> {
        Ok(self.url.clone())
    }

    async fn element_exists(&self, _selector: &str) -> AppResult<bool> {
        Ok(true)
    }

    async fn element_text(&self, _selector: &str) -> AppResult<Option<String>> {
        Ok(Some("Subtotal Shipping Tax Total".to_string()))
    }

    async fn click(&self, _selector: &str) -> AppResult<bool> {
        Ok(true)
    }

    async fn query_rows(&self, _selectors: &Selectors) -> AppResult<Option<Vec<PriceRow>>> {
        Ok(Some(self.rows.clone()))
    }

    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

// ========== 假标签页启动器 ==========

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Respond,
    Silent,
    FailOpen,
}

struct FakeLauncher {
    inspector: Arc<OrderInspector>,
    behaviors: HashMap<String, Behavior>,
    opened: Mutex<Vec<String>>,
}

impl FakeLauncher {
    fn new(store: Arc<dyn SharedStore>, config: &Config) -> Self {
        Self {
            inspector: Arc::new(OrderInspector::new(store, config)),
            behaviors: HashMap::new(),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn with(mut self, order_id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(order_id.to_string(), behavior);
        self
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl ViewLauncher for FakeLauncher {
    async fn open_view(&self, locator: &Url, background: bool) -> AppResult<()> {
        assert!(background, "详情页应在后台打开");
        let order_id = order_id_from_locator(locator).unwrap_or_default();
        self.opened.lock().unwrap().push(order_id.clone());

        match self.behaviors.get(&order_id).copied().unwrap_or(Behavior::Respond) {
            Behavior::FailOpen => Err(AppError::Other("tab refused".into())),
            Behavior::Silent => Ok(()),
            Behavior::Respond => {
                let inspector = self.inspector.clone();
                let page = FakeDetailPage::for_order(locator, &order_id);
                tokio::spawn(async move {
                    let _ = inspector.run(&page).await;
                });
                Ok(())
            }
        }
    }
}

/// 读取待处理列表时总是返回 `pending`，`None` 表示列表丢失
struct TamperedPendingStore {
    inner: MemoryStore,
    pending: Option<JsonValue>,
}

#[async_trait]
impl SharedStore for TamperedPendingStore {
    async fn get(&self, key: &str) -> AppResult<Option<JsonValue>> {
        if key.starts_with("pending:") {
            return Ok(self.pending.clone());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: JsonValue) -> AppResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> AppResult<Vec<String>> {
        self.inner.list_keys().await
    }
}

fn build(
    store: Arc<dyn SharedStore>,
    listing: FakeListing,
    launcher: Arc<FakeLauncher>,
    config: Config,
) -> Orchestrator {
    Orchestrator::new(store, Arc::new(listing), launcher, config)
}

fn assert_accounted(orchestrator: &Orchestrator) {
    let r = orchestrator.results();
    assert_eq!(r.processed, r.successes() + r.errors);
}

// ========== 测试 ==========

#[tokio::test]
async fn test_twenty_five_orders_run_in_three_batches() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store.clone(), FakeListing::with_orders(25), launcher.clone(), config);

    let phase = orchestrator.start_run().await.unwrap();
    assert_eq!(
        phase,
        RunPhase::AwaitingNextBatch {
            completed_batches: 1,
            total_batches: 3,
            next_batch_size: 10,
        }
    );
    assert_eq!(launcher.opened().len(), 10);
    assert_eq!(orchestrator.state(), RunState::BatchDone);
    assert_accounted(&orchestrator);

    let phase = orchestrator.run_next_batch().await.unwrap();
    assert_eq!(
        phase,
        RunPhase::AwaitingNextBatch {
            completed_batches: 2,
            total_batches: 3,
            next_batch_size: 5,
        }
    );
    assert_eq!(launcher.opened().len(), 20);

    let report = match orchestrator.run_next_batch().await.unwrap() {
        RunPhase::Finalized(report) => report,
        other => panic!("expected final report, got {other:?}"),
    };
    assert_eq!(launcher.opened().len(), 25);
    assert_eq!(orchestrator.cursor(), 3);
    assert_eq!(orchestrator.state(), RunState::Finalized);

    assert_eq!(report.results.total_orders, 25);
    assert_eq!(report.results.processed, 25);
    assert_eq!(report.results.errors, 0);
    assert_eq!(report.results.discrepancies, 12);
    assert_eq!(report.results.total_overcharge_value, Money::new(12.0));
    assert_eq!(report.successes, 25);
    assert!(!report.batches_outstanding);

    // 所有记录都已被消费
    assert!(store.list_keys().await.unwrap().is_empty());

    // 结束后不能再开始新批次，报告不再变化
    let err = orchestrator.run_next_batch().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Coordination(CoordinationError::NotReadyForBatch { .. })
    ));
    assert_eq!(orchestrator.finalize(), report);
}

#[tokio::test]
async fn test_silent_and_unopened_workers_time_out_once() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(
        FakeLauncher::new(store.clone(), &config)
            .with("2", Behavior::Silent)
            .with("3", Behavior::FailOpen),
    );
    let mut orchestrator = build(store.clone(), FakeListing::with_orders(4), launcher.clone(), config);

    let report = match orchestrator.start_run().await.unwrap() {
        RunPhase::Finalized(report) => report,
        other => panic!("expected final report, got {other:?}"),
    };

    assert_eq!(launcher.opened(), vec!["1", "2", "3", "4"]);
    assert_eq!(report.results.processed, 4);
    assert_eq!(report.results.errors, 2);
    assert_eq!(report.results.discrepancies, 1);
    assert_eq!(report.successes, 2);
    assert!(store.get("status:2").await.unwrap().is_none());
    assert!(store.get("status:3").await.unwrap().is_none());
    assert_accounted(&orchestrator);
}

#[tokio::test]
async fn test_corrupted_pending_finalizes_with_dispatched_count() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(TamperedPendingStore {
        inner: MemoryStore::new(),
        pending: Some(json!("{broken")),
    });
    let launcher = Arc::new(
        FakeLauncher::new(store.clone(), &config)
            .with("1", Behavior::Silent)
            .with("2", Behavior::Silent)
            .with("3", Behavior::Silent)
            .with("4", Behavior::Silent),
    );
    let mut orchestrator = build(store, FakeListing::with_orders(4), launcher, config);

    let report = match orchestrator.start_run().await.unwrap() {
        RunPhase::Finalized(report) => report,
        other => panic!("expected final report, got {other:?}"),
    };

    assert_eq!(report.results.errors, 4);
    assert_eq!(report.results.processed, 4);
    assert!(report.batches_outstanding);
    assert_eq!(orchestrator.state(), RunState::Finalized);
    assert_accounted(&orchestrator);
}

#[tokio::test]
async fn test_lost_pending_list_charges_dispatched_orders() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(TamperedPendingStore {
        inner: MemoryStore::new(),
        pending: None,
    });
    let launcher = Arc::new(
        FakeLauncher::new(store.clone(), &config)
            .with("1", Behavior::Silent)
            .with("2", Behavior::Silent)
            .with("3", Behavior::Silent),
    );
    let mut orchestrator = build(store, FakeListing::with_orders(3), launcher, config);

    let report = match orchestrator.start_run().await.unwrap() {
        RunPhase::Finalized(report) => report,
        other => panic!("expected final report, got {other:?}"),
    };

    assert_eq!(report.results.processed, 3);
    assert_eq!(report.results.errors, 3);
    assert_eq!(report.successes, 0);
    assert_accounted(&orchestrator);
}

#[tokio::test]
async fn test_dropped_entries_count_as_errors() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut listing = FakeListing::with_orders(3);
    listing.entries.push(OrderEntry {
        info_lines: vec!["Order date: Mar 9, 2024".into()],
        detail_href: None,
    });
    listing.entries.push(order_entry(1));
    let mut orchestrator = build(store, listing, launcher, config);

    let report = match orchestrator.start_run().await.unwrap() {
        RunPhase::Finalized(report) => report,
        other => panic!("expected final report, got {other:?}"),
    };

    assert_eq!(report.results.total_orders, 5);
    assert_eq!(report.results.processed, 5);
    assert_eq!(report.results.errors, 2);
    assert_eq!(report.successes, 3);
}

#[tokio::test]
async fn test_empty_listing_is_no_work_found() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store, FakeListing::with_orders(0), launcher.clone(), config);

    let err = orchestrator.start_run().await.unwrap_err();
    assert!(matches!(err, AppError::Discovery(DiscoveryError::NoWorkFound)));
    assert!(launcher.opened().is_empty());
    assert_eq!(orchestrator.state(), RunState::Idle);
}

#[tokio::test]
async fn test_start_run_while_waiting_for_next_batch_is_rejected() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store, FakeListing::with_orders(15), launcher, config);

    orchestrator.start_run().await.unwrap();
    let err = orchestrator.start_run().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Coordination(CoordinationError::AlreadyRunning)
    ));
    assert_eq!(orchestrator.cursor(), 1);
}

#[tokio::test]
async fn test_operator_can_finalize_early() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store, FakeListing::with_orders(15), launcher.clone(), config);

    orchestrator.start_run().await.unwrap();
    let report = orchestrator.finalize();

    assert!(report.batches_outstanding);
    assert_eq!(report.results.total_orders, 15);
    assert_eq!(report.results.processed, 10);
    assert_eq!(launcher.opened().len(), 10);
    assert_eq!(orchestrator.state(), RunState::Finalized);
}

#[tokio::test]
async fn test_new_run_clears_residual_records() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    store.set("status:old", json!({"state": "pending", "openedAt": 0})).await.unwrap();
    store.set("result:old", json!({"status": "error"})).await.unwrap();
    store.set("pending:7", json!("[\"old\"]")).await.unwrap();
    store.set("preferences", json!({"theme": "dark"})).await.unwrap();

    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store.clone(), FakeListing::with_orders(2), launcher, config);

    let phase = orchestrator.start_run().await.unwrap();
    assert!(matches!(phase, RunPhase::Finalized(_)));
    assert_eq!(store.list_keys().await.unwrap(), vec!["preferences"]);
    assert_eq!(orchestrator.results().processed, 2);
}

#[tokio::test]
async fn test_finalized_run_can_be_restarted() {
    let config = fast_config(10);
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let launcher = Arc::new(FakeLauncher::new(store.clone(), &config));
    let mut orchestrator = build(store, FakeListing::with_orders(3), launcher.clone(), config);

    orchestrator.start_run().await.unwrap();
    let phase = orchestrator.start_run().await.unwrap();

    match phase {
        RunPhase::Finalized(report) => assert_eq!(report.results.processed, 3),
        other => panic!("expected final report, got {other:?}"),
    }
    assert_eq!(launcher.opened().len(), 6);
}
