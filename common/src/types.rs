//! 解析結果の型定義
//!
//! CLIと各フロントエンドで共有される型:
//! - CandidateCompany: 入力スプレッドシートの1行（比較対象企業）
//! - Classification: 分類モードで得られる事業分類
//! - AnalysisResult: 1社ごとの最終出力

use serde::{Deserialize, Serialize};

/// 事業説明が空の場合に使う文言
pub const NO_DESCRIPTION: &str = "No business description available";

/// 企業名が空の場合に使う文言
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// スコア抽出に失敗した場合の理由
pub const NO_SCORE_REASON: &str = "No valid score found, defaulted to 0.00%.";

/// リトライ上限到達時のスコア表示
pub const ERROR_SCORE_LABEL: &str = "Error";

/// リトライ上限到達時の理由（類似度モード）
pub const ERROR_REASON: &str = "N/A";

/// 分類モードの失敗時サマリー
pub const PROCESSING_FAILED: &str = "Processing failed";

/// 解析モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisMode {
    /// 1社ずつ類似度（%）と理由を取得
    Similarity,
    /// 複数社まとめてJSONで分類＋関連度を取得
    Classification,
}

impl AnalysisMode {
    /// 出力スプレッドシートの列名
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            AnalysisMode::Similarity => &[
                "Company Name",
                "Business Description",
                "Similarity Score (%)",
                "Reason for Score",
            ],
            AnalysisMode::Classification => &[
                "Company Name",
                "Original Business Description",
                "Business Summary",
                "Industry Classification",
                "Business Model",
                "Key Products/Services",
                "Market Focus",
                "Relevance Score",
                "Relevance Reason",
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Similarity => "similarity",
            AnalysisMode::Classification => "classification",
        }
    }
}

/// 比較対象企業（入力1行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCompany {
    pub name: String,
    pub description: String,
}

impl CandidateCompany {
    /// 空欄を既定文言に置き換えて生成
    pub fn new(name: &str, description: &str) -> Self {
        let name = name.trim();
        let description = description.trim();
        Self {
            name: if name.is_empty() { UNKNOWN_COMPANY.to_string() } else { name.to_string() },
            description: if description.is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                description.to_string()
            },
        }
    }

    /// プロンプト埋め込み用の事業説明（空なら既定文言）
    pub fn description_or_default(&self) -> &str {
        if self.description.trim().is_empty() {
            NO_DESCRIPTION
        } else {
            &self.description
        }
    }
}

/// 事業分類（分類モードのみ）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Classification {
    pub business_summary: String,
    pub industry: String,
    pub business_model: String,
    pub key_products_services: String,
    pub market_focus: String,
}

impl Classification {
    /// バッチ内でAIの回答が不足した企業用
    pub fn unavailable() -> Self {
        Self {
            business_summary: "Analysis not available".into(),
            industry: "Not classified".into(),
            business_model: "Not specified".into(),
            key_products_services: "Not specified".into(),
            market_focus: "Not specified".into(),
        }
    }

    /// リトライ上限到達時
    pub fn failed() -> Self {
        Self {
            business_summary: PROCESSING_FAILED.into(),
            industry: ERROR_SCORE_LABEL.into(),
            business_model: ERROR_SCORE_LABEL.into(),
            key_products_services: ERROR_SCORE_LABEL.into(),
            market_focus: ERROR_SCORE_LABEL.into(),
        }
    }
}

/// 解析状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultStatus {
    #[default]
    Scored,
    /// リトライ上限到達（スコアは0.00で保持）
    Failed,
}

/// AI解析結果（1社分）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub company_name: String,

    pub original_description: String,

    /// 0〜100にクランプ済み
    pub relevance_score: f64,

    #[serde(default)]
    pub relevance_reason: String,

    #[serde(default)]
    pub classification: Option<Classification>,

    #[serde(default)]
    pub status: ResultStatus,
}

impl AnalysisResult {
    /// 類似度モードの成功結果
    pub fn scored(candidate: &CandidateCompany, score: f64, reason: impl Into<String>) -> Self {
        Self {
            company_name: candidate.name.clone(),
            original_description: candidate.description.clone(),
            relevance_score: clamp_score(score),
            relevance_reason: reason.into(),
            classification: None,
            status: ResultStatus::Scored,
        }
    }

    /// 類似度モードの失敗結果（スコア "Error"、理由 "N/A"）
    pub fn failed(candidate: &CandidateCompany) -> Self {
        Self {
            company_name: candidate.name.clone(),
            original_description: candidate.description.clone(),
            relevance_score: 0.0,
            relevance_reason: ERROR_REASON.into(),
            classification: None,
            status: ResultStatus::Failed,
        }
    }

    /// 分類モードの結果
    pub fn classified(
        candidate: &CandidateCompany,
        classification: Classification,
        score: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            company_name: candidate.name.clone(),
            original_description: candidate.description.clone(),
            relevance_score: clamp_score(score),
            relevance_reason: reason.into(),
            classification: Some(classification),
            status: ResultStatus::Scored,
        }
    }

    /// AIの回答リストに対応する要素がなかった企業
    pub fn unavailable(candidate: &CandidateCompany) -> Self {
        Self::classified(candidate, Classification::unavailable(), 0.0, "Analysis incomplete")
    }

    /// 分類モードでバッチ全体が失敗した場合
    pub fn batch_failed(candidate: &CandidateCompany, error: &str) -> Self {
        Self {
            status: ResultStatus::Failed,
            ..Self::classified(
                candidate,
                Classification::failed(),
                0.0,
                format!("Processing error: {}", error),
            )
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ResultStatus::Failed
    }

    /// 業種（分類なしの場合は空文字）
    pub fn industry(&self) -> &str {
        self.classification
            .as_ref()
            .map(|c| c.industry.as_str())
            .unwrap_or("")
    }

    /// スプレッドシート表示用のスコア文字列
    pub fn score_label(&self) -> String {
        if self.is_failed() && self.classification.is_none() {
            ERROR_SCORE_LABEL.to_string()
        } else {
            format!("{:.2}", self.relevance_score)
        }
    }

    /// 出力行（AnalysisMode::columns と同じ並び）
    pub fn to_row(&self, mode: AnalysisMode) -> Vec<String> {
        match mode {
            AnalysisMode::Similarity => vec![
                self.company_name.clone(),
                self.original_description.clone(),
                self.score_label(),
                self.relevance_reason.clone(),
            ],
            AnalysisMode::Classification => {
                let c = self.classification.clone().unwrap_or_default();
                vec![
                    self.company_name.clone(),
                    self.original_description.clone(),
                    c.business_summary,
                    c.industry,
                    c.business_model,
                    c.key_products_services,
                    c.market_focus,
                    self.score_label(),
                    self.relevance_reason.clone(),
                ]
            }
        }
    }
}

/// スコアを0〜100に収める（NaNは0）
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
