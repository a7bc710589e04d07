use gst_checker::browser::connect_to_browser_and_page;
use gst_checker::config::Config;
use gst_checker::infrastructure::JsExecutor;
use gst_checker::services::discover;
use gst_checker::utils::logging;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器连接
    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore] // 需要已登录的订单列表页
async fn test_discover_orders_on_live_page() {
    logging::init();

    let config = Config::from_env();

    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    tokio::time::sleep(config.list_settle()).await;

    let listing = JsExecutor::new(page);
    let discovery = discover(&listing, &config.selectors)
        .await
        .expect("读取订单列表失败");

    assert!(discovery.entries_seen > 0, "列表页上应该至少有一个订单");
    assert_eq!(
        discovery.items.len() + discovery.dropped.len(),
        discovery.entries_seen
    );
}
