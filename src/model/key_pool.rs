//! APIキーのローテーション管理
//!
//! 呼び出し回数がキーあたりの上限を超えたら次のキーへ進む（末尾の次は先頭）。
//! 判定は呼び出し前に行い、直前の呼び出しの成否には依存しない。

use crate::error::{CompsAiError, Result};

#[derive(Debug, Clone)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    index: usize,
    calls_with_current: usize,
    usage_limit: usize,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>, usage_limit: usize) -> Result<Self> {
        if keys.is_empty() {
            return Err(CompsAiError::MissingApiKey);
        }
        if usage_limit == 0 {
            return Err(CompsAiError::Config("key_usage_limit must be at least 1".into()));
        }
        Ok(Self {
            keys,
            index: 0,
            calls_with_current: 0,
            usage_limit,
        })
    }

    pub fn current_key(&self) -> &str {
        &self.keys[self.index]
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn calls_with_current(&self) -> usize {
        self.calls_with_current
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 呼び出しを1回記録する。上限を超えてキーを切り替えた場合true
    pub fn record_call(&mut self) -> bool {
        self.calls_with_current += 1;
        if self.calls_with_current > self.usage_limit {
            self.index = (self.index + 1) % self.keys.len();
            self.calls_with_current = 1;
            true
        } else {
            false
        }
    }
}
