//! 集計・レポート
//!
//! マージ後の結果に対する処理:
//! - rank_results: 0〜100にクリップして降順ソート
//! - RelevanceBand: 高/中/低の関連度帯（出力シート分けのみに使用）
//! - summarize: 帯ごとの件数と平均スコア、上位企業、業種・ビジネスモデルの分布
//! - ResultFilter: 最低スコア・業種による絞込み

use crate::types::{clamp_score, AnalysisResult, Classification};
use serde::{Deserialize, Serialize};

/// 高関連度の下限
pub const HIGH_THRESHOLD: f64 = 70.0;

/// 中関連度の下限
pub const MEDIUM_THRESHOLD: f64 = 50.0;

/// 集計に載せる上位企業数
pub const TOP_COMPANIES: usize = 10;

/// 業種分布に載せる件数
pub const TOP_INDUSTRIES: usize = 10;

/// ビジネスモデル分布に載せる件数
pub const TOP_BUSINESS_MODELS: usize = 8;

/// 関連度帯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelevanceBand {
    High,
    Medium,
    Low,
}

impl RelevanceBand {
    pub const ALL: [RelevanceBand; 3] = [RelevanceBand::High, RelevanceBand::Medium, RelevanceBand::Low];

    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            RelevanceBand::High
        } else if score >= MEDIUM_THRESHOLD {
            RelevanceBand::Medium
        } else {
            RelevanceBand::Low
        }
    }

    /// 出力ワークシート名
    pub fn sheet_name(&self) -> &'static str {
        match self {
            RelevanceBand::High => "High_Relevance_70+",
            RelevanceBand::Medium => "Medium_Relevance_50-69",
            RelevanceBand::Low => "Low_Relevance_0-49",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceBand::High => "High (70+)",
            RelevanceBand::Medium => "Medium (50-69)",
            RelevanceBand::Low => "Low (<50)",
        }
    }

    pub fn contains(&self, score: f64) -> bool {
        Self::from_score(score) == *self
    }
}

/// スコアをクリップし、降順に並べ替える（同点は入力順を維持）
pub fn rank_results(mut results: Vec<AnalysisResult>) -> Vec<AnalysisResult> {
    for r in &mut results {
        r.relevance_score = clamp_score(r.relevance_score);
    }
    results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    results
}

/// 指定した帯に属する結果のみ抽出
pub fn partition_band(results: &[AnalysisResult], band: RelevanceBand) -> Vec<&AnalysisResult> {
    results
        .iter()
        .filter(|r| band.contains(r.relevance_score))
        .collect()
}

/// 帯ごとの集計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub band: RelevanceBand,
    pub count: usize,
    /// 件数0の場合は0.0
    pub mean_score: f64,
}

/// 全体の集計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
    pub mean_score: f64,
    pub bands: Vec<BandSummary>,
    /// スコア上位（同点は入力順）
    pub top_companies: Vec<RankedCompany>,
    /// 分類結果がある場合のみ
    pub industries: Vec<CategoryCount>,
    pub business_models: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCompany {
    pub company_name: String,
    pub relevance_score: f64,
    /// 分類なしの場合は空文字
    pub industry: String,
}

/// 区分ごとの件数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

pub fn summarize(results: &[AnalysisResult]) -> RunSummary {
    let bands = RelevanceBand::ALL
        .iter()
        .map(|&band| {
            let scores: Vec<f64> = partition_band(results, band)
                .iter()
                .map(|r| r.relevance_score)
                .collect();
            BandSummary {
                band,
                count: scores.len(),
                mean_score: mean(&scores),
            }
        })
        .collect();

    let all: Vec<f64> = results.iter().map(|r| r.relevance_score).collect();

    RunSummary {
        total: results.len(),
        failed: results.iter().filter(|r| r.is_failed()).count(),
        mean_score: mean(&all),
        bands,
        top_companies: top_companies(results, TOP_COMPANIES),
        industries: category_counts(results, TOP_INDUSTRIES, |c| &c.industry),
        business_models: category_counts(results, TOP_BUSINESS_MODELS, |c| &c.business_model),
    }
}

fn top_companies(results: &[AnalysisResult], limit: usize) -> Vec<RankedCompany> {
    let mut ranked: Vec<&AnalysisResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked
        .into_iter()
        .take(limit)
        .map(|r| RankedCompany {
            company_name: r.company_name.clone(),
            relevance_score: r.relevance_score,
            industry: r.industry().to_string(),
        })
        .collect()
}

/// 分類項目の出現件数（多い順、同数は初出順、空欄は数えない）
fn category_counts<F>(results: &[AnalysisResult], limit: usize, field: F) -> Vec<CategoryCount>
where
    F: Fn(&Classification) -> &String,
{
    let mut counts: Vec<CategoryCount> = Vec::new();
    for classification in results.iter().filter_map(|r| r.classification.as_ref()) {
        let label = field(classification).trim();
        if label.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|c| c.label == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                label: label.to_string(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// 結果の絞込み条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFilter {
    /// この値以上のみ残す
    pub min_score: f64,
    /// 空なら業種で絞り込まない（大文字小文字は区別しない）
    pub industries: Vec<String>,
}

impl ResultFilter {
    pub fn is_empty(&self) -> bool {
        self.min_score <= 0.0 && self.industries.is_empty()
    }

    pub fn matches(&self, result: &AnalysisResult) -> bool {
        if result.relevance_score < self.min_score {
            return false;
        }
        if self.industries.is_empty() {
            return true;
        }
        let industry = result.industry().trim();
        self.industries
            .iter()
            .any(|wanted| wanted.trim().eq_ignore_ascii_case(industry))
    }

    pub fn apply(&self, results: &[AnalysisResult]) -> Vec<AnalysisResult> {
        results.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
