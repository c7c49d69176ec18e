//! 言語モデル呼び出しラッパー
//!
//! - TextModel: 外部モデルの唯一の呼び出し口（プロンプト＋キー → テキスト）
//! - ModelSession: キープールを持ち、初期化チェックとローテーションを行う

mod gemini;
mod key_pool;

pub use gemini::GeminiClient;
pub use key_pool::ApiKeyPool;

use crate::error::{CompsAiError, Result};
use comps_ai_common::{SELF_TEST_PROMPT, SELF_TEST_TOKEN};
use std::future::Future;

/// 外部言語モデル
pub trait TextModel {
    fn generate(&self, api_key: &str, prompt: &str) -> impl Future<Output = Result<String>>;
}

/// キーローテーション付きのモデル呼び出し
pub struct ModelSession<M> {
    model: M,
    pool: ApiKeyPool,
    calls: usize,
}

impl<M: TextModel> ModelSession<M> {
    /// 最初のキーで初期化チェックを行って接続
    ///
    /// チェック失敗は設定エラーとして扱い、呼び出し側で処理を中断する。
    pub async fn connect(model: M, pool: ApiKeyPool) -> Result<Self> {
        let session = Self { model, pool, calls: 0 };
        session.self_test().await?;
        tracing::info!(
            key_index = session.pool.current_index(),
            keys = session.pool.len(),
            "model initialized"
        );
        Ok(session)
    }

    /// "Say OK" を送り、応答に OK が含まれるか確認
    pub async fn self_test(&self) -> Result<()> {
        let response = self
            .model
            .generate(self.pool.current_key(), SELF_TEST_PROMPT)
            .await
            .map_err(|e| CompsAiError::SelfTest(e.to_string()))?;

        if !response.contains(SELF_TEST_TOKEN) {
            let preview: String = response.chars().take(80).collect();
            return Err(CompsAiError::SelfTest(format!(
                "Unexpected response: {}",
                preview
            )));
        }
        Ok(())
    }

    /// プロンプトを送信（呼び出し前にローテーション判定）
    pub async fn generate(&mut self, prompt: &str) -> Result<String> {
        let previous = self.pool.current_index();
        if self.pool.record_call() && self.pool.current_index() != previous {
            tracing::info!(
                from = previous + 1,
                to = self.pool.current_index() + 1,
                "rotating API key"
            );
            self.self_test().await?;
        }

        self.calls += 1;
        self.model.generate(self.pool.current_key(), prompt).await
    }

    pub fn pool(&self) -> &ApiKeyPool {
        &self.pool
    }

    /// 初期化チェックを除いた呼び出し回数
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}
