//! 有界等待
//!
//! 所有"等元素出现 / 等文本出现"都基于 `await_condition`

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 等待超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    pub waited: Duration,
}

impl WaitTimeout {
    pub fn waited_ms(&self) -> u64 {
        self.waited.as_millis() as u64
    }
}

/// 按固定间隔探测，直到 `probe` 返回 `Some` 或超时
///
/// 探测至少执行一次
pub async fn await_condition<T, F, Fut>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(WaitTimeout { waited });
        }
        sleep(interval.min(timeout - waited)).await;
    }
}
