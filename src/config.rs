use crate::error::{CompsAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 複数キーをカンマ区切りで指定する環境変数
pub const API_KEYS_ENV: &str = "GEMINI_API_KEYS";

/// 単一キーの環境変数
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub model: String,
    /// 1キーあたりの呼び出し回数上限（超えたら次のキーへ）
    pub key_usage_limit: usize,
    pub batch_size: usize,
    /// 何ユニットごとにチェックポイントを書くか
    pub checkpoint_interval: usize,
    pub max_retries: usize,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gemini-2.5-flash-lite".into(),
            key_usage_limit: 15,
            batch_size: 3,
            checkpoint_interval: 10,
            max_retries: 3,
            timeout_seconds: 120,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CompsAiError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("comps-ai").join("config.json"))
    }

    /// 使用するAPIキー一覧（環境変数を優先）
    pub fn resolve_api_keys(&self) -> Result<Vec<String>> {
        resolve_keys(
            std::env::var(API_KEYS_ENV).ok().as_deref(),
            std::env::var(API_KEY_ENV).ok().as_deref(),
            &self.api_keys,
        )
    }

    /// キーを追加（重複・空は無視）。追加した場合true
    pub fn add_api_key(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() || self.api_keys.iter().any(|k| k == key) {
            return false;
        }
        self.api_keys.push(key.to_string());
        true
    }

    /// 1始まりの番号でキーを削除
    pub fn remove_api_key(&mut self, number: usize) -> Result<String> {
        if number == 0 || number > self.api_keys.len() {
            return Err(CompsAiError::Config(format!(
                "key #{} does not exist ({} keys stored)",
                number,
                self.api_keys.len()
            )));
        }
        Ok(self.api_keys.remove(number - 1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CompsAiError::Config("batch_size must be at least 1".into()));
        }
        if self.checkpoint_interval == 0 {
            return Err(CompsAiError::Config(
                "checkpoint_interval must be at least 1".into(),
            ));
        }
        if self.key_usage_limit == 0 {
            return Err(CompsAiError::Config("key_usage_limit must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(CompsAiError::Config("max_retries must be at least 1".into()));
        }
        Ok(())
    }
}

/// 環境変数（複数）> 環境変数（単一）> 設定ファイル の順で解決
pub fn resolve_keys(multi: Option<&str>, single: Option<&str>, stored: &[String]) -> Result<Vec<String>> {
    let from_multi: Vec<String> = multi
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();
    if !from_multi.is_empty() {
        return Ok(from_multi);
    }

    if let Some(key) = single.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(vec![key.to_string()]);
    }

    let stored: Vec<String> = stored
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if stored.is_empty() {
        Err(CompsAiError::MissingApiKey)
    } else {
        Ok(stored)
    }
}

/// 表示用にキーを伏せる（先頭8文字...末尾4文字）
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
