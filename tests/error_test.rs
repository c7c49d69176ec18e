//! エラーケーステスト
//!
//! 入力ファイル・設定・モデル初期化の各エラー条件を検証

use comps_ai_common::SELF_TEST_PROMPT;
use comps_ai_rust::config::{resolve_keys, Config};
use comps_ai_rust::error::{CompsAiError, Result};
use comps_ai_rust::model::{ApiKeyPool, ModelSession, TextModel};
use comps_ai_rust::spreadsheet;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::tempdir;

/// 存在しない入力ファイル
#[test]
fn test_read_nonexistent_input() {
    let result = spreadsheet::read_candidates(Path::new("/nonexistent/path/input.xlsx"));
    assert!(matches!(result, Err(CompsAiError::FileNotFound(_))));
}

/// 必須列が片方だけの入力
#[test]
fn test_input_missing_description_column() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("input.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Company Name").unwrap();
    sheet.write_string(1, 0, "Alpha").unwrap();
    workbook.save(&path).unwrap();

    match spreadsheet::read_candidates(&path) {
        Err(CompsAiError::MissingColumns(cols)) => {
            assert_eq!(cols, "Business Description");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

/// スプレッドシートでないファイル
#[test]
fn test_read_invalid_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("input.xlsx");
    std::fs::write(&path, "not a workbook").unwrap();

    let result = spreadsheet::read_candidates(&path);
    assert!(matches!(result, Err(CompsAiError::ExcelRead(_))));
}

/// キーが1つも無い
#[test]
fn test_no_api_keys() {
    let result = resolve_keys(None, None, &[]);
    assert!(matches!(result, Err(CompsAiError::MissingApiKey)));

    let result = ApiKeyPool::new(Vec::new(), 15);
    assert!(matches!(result, Err(CompsAiError::MissingApiKey)));
}

/// 壊れた設定ファイル
#[test]
fn test_corrupt_config_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = Config::load_from(&path);
    assert!(matches!(result, Err(CompsAiError::JsonParse(_))));
}

/// 初期化チェックに失敗するモデル
struct RefusingModel;

impl TextModel for RefusingModel {
    async fn generate(&self, _api_key: &str, prompt: &str) -> Result<String> {
        if prompt == SELF_TEST_PROMPT {
            Ok("I'd rather not.".to_string())
        } else {
            Ok("50%".to_string())
        }
    }
}

/// 接続時の初期化チェック失敗は致命的
#[tokio::test]
async fn test_self_test_failure_is_fatal() {
    let pool = ApiKeyPool::new(vec!["key-1".into()], 15).unwrap();
    let result = ModelSession::connect(RefusingModel, pool).await;
    assert!(matches!(result, Err(CompsAiError::SelfTest(_))));
}

/// CompsAiErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        CompsAiError::Config("bad value".to_string()),
        CompsAiError::EmptyTarget,
        CompsAiError::FileNotFound("input.xlsx".to_string()),
        CompsAiError::MissingColumns("Company Name".to_string()),
        CompsAiError::ApiCall("503".to_string()),
        CompsAiError::ExcelGeneration("disk full".to_string()),
        CompsAiError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".to_string(),
        },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "empty error message: {:?}", err);
    }
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let display = format!("{}", CompsAiError::MissingApiKey);

    assert!(display.contains("API key"));
    assert!(display.contains("comps-ai config"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: CompsAiError = io_err.into();

    assert!(matches!(err, CompsAiError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = comps_ai_common::Error::Parse("No JSON found in response".to_string());
    let err: CompsAiError = common_err.into();

    assert!(matches!(err, CompsAiError::Common(_)));
    assert!(format!("{}", err).contains("No JSON found"));
}
