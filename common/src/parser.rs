//! APIレスポンスパーサー
//!
//! モデルの自由記述レスポンスから以下を取り出す:
//! - 類似度モード: 最初の「数値%」とその後ろの理由文
//! - 分類モード: 埋め込まれたJSONオブジェクト（"companies" 配列）
//!
//! モデル出力の形式は保証されないため、抽出は全てここに集約する。

use crate::error::{Error, Result};
use crate::types::{AnalysisResult, CandidateCompany, Classification, NO_SCORE_REASON};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 類似度レスポンスからスコアと理由を抽出
///
/// `<1〜3桁>[.<桁>] %` に一致する最初の箇所をスコアとし、小数第2位で丸める。
/// 一致以降のテキスト（trim済み）を理由とする。
/// 見つからない場合は `0.00` と固定文言を返す。失敗しない。
///
/// # Examples
/// ```
/// use comps_ai_common::extract_score;
///
/// let (score, reason) = extract_score("87.456%\nStrong overlap in oilseed crushing.");
/// assert_eq!(score, 87.46);
/// assert_eq!(reason, "Strong overlap in oilseed crushing.");
/// ```
pub fn extract_score(response: &str) -> (f64, String) {
    lazy_static::lazy_static! {
        static ref SCORE_RE: Regex = Regex::new(r"(\d{1,3}(?:\.\d+)?) ?%").unwrap();
    }

    let parsed = SCORE_RE.captures(response).and_then(|cap| {
        let whole = cap.get(0)?;
        let value: f64 = cap[1].parse().ok()?;
        Some((round2(value), response[whole.end()..].trim().to_string()))
    });

    parsed.unwrap_or_else(|| (0.0, NO_SCORE_REASON.to_string()))
}

/// 小数第2位で丸める
///
/// 2進表現の正確な値で判定し、ちょうど中間の場合は偶数側に丸める（0.125 → 0.12, 2.675 → 2.67）。
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json { ... } ``` ブロック
/// 2. 最初の `{` から最後の `}` まで
/// 3. エラー
pub fn extract_json(response: &str) -> Result<&str> {
    lazy_static::lazy_static! {
        static ref FENCED_RE: Regex = Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap();
    }

    if let Some(cap) = FENCED_RE.captures(response) {
        if let Some(m) = cap.get(1) {
            return Ok(m.as_str());
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            return Ok(&response[start..=end]);
        }
    }

    Err(Error::Parse("No JSON found in response".into()))
}

/// 分類レスポンス全体
#[derive(Debug, Default, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    companies: Vec<CompanyAnalysis>,
}

/// 1社分の分析（モデル出力そのまま）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyAnalysis {
    #[serde(deserialize_with = "lenient_text")]
    pub company_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub business_summary: Option<String>,
    #[serde(deserialize_with = "lenient_text", alias = "industry")]
    pub industry_classification: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub business_model: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub key_products_services: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market_focus: Option<String>,
    pub relevance_score: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub relevance_reason: Option<String>,
}

impl CompanyAnalysis {
    /// 入力企業と組み合わせて結果を作る（企業名・事業説明は入力側を使う）
    fn into_result(self, candidate: &CandidateCompany) -> AnalysisResult {
        let score = clean_relevance_score(self.relevance_score.as_ref());
        let classification = Classification {
            business_summary: self
                .business_summary
                .unwrap_or_else(|| "No summary available".into()),
            industry: self
                .industry_classification
                .unwrap_or_else(|| "Not classified".into()),
            business_model: self.business_model.unwrap_or_else(|| "Not specified".into()),
            key_products_services: self
                .key_products_services
                .unwrap_or_else(|| "Not specified".into()),
            market_focus: self.market_focus.unwrap_or_else(|| "Not specified".into()),
        };
        let reason = self
            .relevance_reason
            .unwrap_or_else(|| "No reason provided".into());

        AnalysisResult::classified(candidate, classification, score, reason)
    }
}

/// 文字列以外の値も文字列として受け入れる（配列は ", " 連結）
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

/// 分類レスポンスをパースしてバッチ内の企業と位置で対応付ける
///
/// - i番目の企業 ↔ "companies" のi番目
/// - 件数不一致は警告ログのみ（不足分は "Analysis not available"、余剰分は無視）
/// - JSONが見つからない・壊れている場合は `Error::Parse`（呼び出し側でリトライ）
pub fn parse_batch_response(
    response: &str,
    batch: &[CandidateCompany],
) -> Result<Vec<AnalysisResult>> {
    let json_str = extract_json(response)?;
    let parsed: BatchResponse = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("Batch JSON parse error: {}", e)))?;

    if parsed.companies.len() != batch.len() {
        tracing::warn!(
            expected = batch.len(),
            received = parsed.companies.len(),
            "analysis count does not match batch size"
        );
    }

    let mut analyses = parsed.companies.into_iter();
    let results = batch
        .iter()
        .map(|candidate| match analyses.next() {
            Some(analysis) => analysis.into_result(candidate),
            None => AnalysisResult::unavailable(candidate),
        })
        .collect();

    Ok(results)
}

/// 関連度スコアをf64に変換
///
/// - 数値: そのまま
/// - 文字列: 数字と `.` 以外を除去してパース（失敗・空は0.00）
/// - null・欠落・その他: 0.00
pub fn clean_relevance_score(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => clean_score_text(s),
        _ => 0.0,
    }
}

/// 文字列スコアの正規化（"75.5%" → 75.5）
pub fn clean_score_text(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    cleaned.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResultStatus, NO_DESCRIPTION};
    use serde_json::json;

    fn batch(names: &[&str]) -> Vec<CandidateCompany> {
        names
            .iter()
            .map(|n| CandidateCompany::new(n, &format!("{} description", n)))
            .collect()
    }

    // =============================================
    // extract_score テスト
    // =============================================

    #[test]
    fn test_extract_score_basic() {
        let (score, reason) = extract_score("91.35%\nBoth refine edible oils in India.");
        assert_eq!(score, 91.35);
        assert_eq!(reason, "Both refine edible oils in India.");
    }

    #[test]
    fn test_extract_score_rounds_to_two_decimals() {
        let (score, _) = extract_score("Score: 66.666% overlap");
        assert_eq!(score, 66.67);
    }

    #[test]
    fn test_extract_score_ties_round_to_even() {
        assert_eq!(extract_score("0.125%").0, 0.12);
        assert_eq!(extract_score("0.375%").0, 0.38);
        // 2.675 は2進では 2.67499... なので切り下げ
        assert_eq!(extract_score("2.675%").0, 2.67);
        assert_eq!(extract_score("87.456%").0, 87.46);
    }

    #[test]
    fn test_extract_score_integer_with_space() {
        let (score, reason) = extract_score("I would rate this 45 % because of scale.");
        assert_eq!(score, 45.0);
        assert_eq!(reason, "because of scale.");
    }

    #[test]
    fn test_extract_score_takes_first_match() {
        let (score, reason) = extract_score("12% now, maybe 80% later");
        assert_eq!(score, 12.0);
        assert_eq!(reason, "now, maybe 80% later");
    }

    #[test]
    fn test_extract_score_empty_reason() {
        let (score, reason) = extract_score("  100%  ");
        assert_eq!(score, 100.0);
        assert_eq!(reason, "");
    }

    #[test]
    fn test_extract_score_no_pattern() {
        let (score, reason) = extract_score("I could not find this company.");
        assert_eq!(score, 0.0);
        assert_eq!(reason, NO_SCORE_REASON);
    }

    #[test]
    fn test_extract_score_empty_response() {
        let (score, reason) = extract_score("");
        assert_eq!(score, 0.0);
        assert_eq!(reason, NO_SCORE_REASON);
    }

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_fenced_block() {
        let response = "Here you go:\n```json\n{\"companies\": [{\"a\": {\"b\": 1}}]}\n```\nThanks";
        let json = extract_json(response).unwrap();
        assert_eq!(json, "{\"companies\": [{\"a\": {\"b\": 1}}]}");
    }

    #[test]
    fn test_extract_json_braces_fallback() {
        let response = "Result: {\"companies\": []} -- end";
        assert_eq!(extract_json(response).unwrap(), "{\"companies\": []}");
    }

    #[test]
    fn test_extract_json_missing_braces() {
        let result = extract_json("no json at all");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_extract_json_reversed_braces() {
        assert!(extract_json("} oops {").is_err());
    }

    // =============================================
    // parse_batch_response テスト
    // =============================================

    #[test]
    fn test_parse_batch_equal_length() {
        let response = r#"```json
{
  "companies": [
    {
      "company_name": "Model says Alpha",
      "business_summary": "Mills wheat",
      "industry_classification": "Agribusiness",
      "business_model": "B2B sales",
      "key_products_services": ["Flour", "Bran"],
      "market_focus": "India",
      "relevance_score": 82.5,
      "relevance_reason": "Grain processing overlap"
    },
    {
      "business_summary": "Ships containers",
      "relevance_score": "35%"
    }
  ]
}
```"#;
        let input = batch(&["Alpha", "Beta"]);
        let results = parse_batch_response(response, &input).unwrap();
        assert_eq!(results.len(), 2);

        let alpha = &results[0];
        assert_eq!(alpha.company_name, "Alpha");
        assert_eq!(alpha.original_description, "Alpha description");
        assert_eq!(alpha.relevance_score, 82.5);
        let c = alpha.classification.as_ref().unwrap();
        assert_eq!(c.industry, "Agribusiness");
        assert_eq!(c.key_products_services, "Flour, Bran");

        let beta = &results[1];
        assert_eq!(beta.relevance_score, 35.0);
        assert_eq!(beta.relevance_reason, "No reason provided");
        let c = beta.classification.as_ref().unwrap();
        assert_eq!(c.industry, "Not classified");
        assert_eq!(c.business_model, "Not specified");
    }

    #[test]
    fn test_parse_batch_fewer_analyses_uses_fallback() {
        let response = r#"{"companies": [{"business_summary": "Only one", "relevance_score": 50}]}"#;
        let input = batch(&["A", "B", "C"]);
        let results = parse_batch_response(response, &input).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].relevance_score, 50.0);
        for r in &results[1..] {
            assert_eq!(r.relevance_score, 0.0);
            assert_eq!(r.relevance_reason, "Analysis incomplete");
            assert_eq!(
                r.classification.as_ref().unwrap().business_summary,
                "Analysis not available"
            );
            assert_eq!(r.status, ResultStatus::Scored);
        }
        assert_eq!(results[2].company_name, "C");
    }

    #[test]
    fn test_parse_batch_extra_analyses_ignored() {
        let response = r#"{"companies": [{"relevance_score": 10}, {"relevance_score": 20}, {"relevance_score": 30}]}"#;
        let input = batch(&["A"]);
        let results = parse_batch_response(response, &input).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance_score, 10.0);
    }

    #[test]
    fn test_parse_batch_missing_companies_field() {
        let input = batch(&["A", "B"]);
        let results = parse_batch_response(r#"{"result": "none"}"#, &input).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.relevance_reason == "Analysis incomplete"));
    }

    #[test]
    fn test_parse_batch_score_clamped() {
        let input = batch(&["A"]);
        let results =
            parse_batch_response(r#"{"companies": [{"relevance_score": 180}]}"#, &input).unwrap();
        assert_eq!(results[0].relevance_score, 100.0);
    }

    #[test]
    fn test_parse_batch_malformed_json() {
        let input = batch(&["A"]);
        let result = parse_batch_response(r#"{"companies": [{"relevance_score": }"#, &input);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_batch_no_json() {
        let input = batch(&["A"]);
        assert!(parse_batch_response("Sorry, I cannot help.", &input).is_err());
    }

    #[test]
    fn test_parse_batch_keeps_input_sentinel_description() {
        let input = vec![CandidateCompany::new("Blank Co", "")];
        let results =
            parse_batch_response(r#"{"companies": [{"relevance_score": 5}]}"#, &input).unwrap();
        assert_eq!(results[0].original_description, NO_DESCRIPTION);
    }

    // =============================================
    // clean_relevance_score テスト
    // =============================================

    #[test]
    fn test_clean_score_numeric() {
        assert_eq!(clean_relevance_score(Some(&json!(75.5))), 75.5);
        assert_eq!(clean_relevance_score(Some(&json!(40))), 40.0);
    }

    #[test]
    fn test_clean_score_string() {
        assert_eq!(clean_relevance_score(Some(&json!("75.50"))), 75.5);
        assert_eq!(clean_relevance_score(Some(&json!("Score: 62.3%"))), 62.3);
        assert_eq!(clean_relevance_score(Some(&json!("high"))), 0.0);
        assert_eq!(clean_relevance_score(Some(&json!(""))), 0.0);
        assert_eq!(clean_relevance_score(Some(&json!("1.2.3"))), 0.0);
    }

    #[test]
    fn test_clean_score_null_or_missing() {
        assert_eq!(clean_relevance_score(None), 0.0);
        assert_eq!(clean_relevance_score(Some(&Value::Null)), 0.0);
        assert_eq!(clean_relevance_score(Some(&json!(["80"]))), 0.0);
    }

    #[test]
    fn test_clean_score_idempotent() {
        for input in [json!("  88.25 points"), json!(12), json!(null), json!("n/a")] {
            let once = clean_relevance_score(Some(&input));
            let twice = clean_relevance_score(Some(&json!(once)));
            assert_eq!(once, twice, "input: {}", input);
        }
    }
}
