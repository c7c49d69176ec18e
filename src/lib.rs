//! comps-ai: 比較対象企業のAIスクリーニング
//!
//! 共通ロジック（プロンプト・パーサー・集計）は comps-ai-common、
//! IOを伴う処理（モデル呼び出し・スプレッドシート・パイプライン）はこのクレート。

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod spreadsheet;
