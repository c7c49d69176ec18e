//! リトライ制御
//!
//! 1ユニット（1社または1バッチ）の「プロンプト送信→抽出」を
//! 最大試行回数まで固定間隔で繰り返す。バックオフはしない。

use crate::error::{CompsAiError, Result};
use std::time::Duration;

/// 類似度モードの試行間隔
pub const SIMILARITY_RETRY_DELAY: Duration = Duration::from_secs(10);

/// 分類モードの試行間隔
pub const CLASSIFICATION_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, SIMILARITY_RETRY_DELAY)
    }
}

#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 成功するか試行回数を使い切るまで `op` を実行
    ///
    /// 試行の間だけ待機し、最後の失敗の後は待たない。
    pub async fn run<T, F>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: AsyncFnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        unit = label,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "attempt failed"
                    );
                    if attempt >= self.policy.max_attempts {
                        return Err(CompsAiError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }

    /// `run` の失敗をフォールバック値に置き換える（エラーを返さない）
    pub async fn run_or_else<T, F, G>(&self, label: &str, op: F, fallback: G) -> T
    where
        F: AsyncFnMut() -> Result<T>,
        G: FnOnce(&CompsAiError) -> T,
    {
        match self.run(label, op).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(unit = label, error = %e, "giving up, recording failure");
                fallback(&e)
            }
        }
    }
}
