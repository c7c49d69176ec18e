//! プロンプト生成モジュール
//!
//! CLIと各フロントエンドで共有されるプロンプト生成ロジック:
//! - build_similarity_prompt: 1社ずつの類似度スコア用
//! - build_classification_prompt: 複数社まとめての分類用（JSON出力）
//! - SELF_TEST_PROMPT: APIキー初期化確認用

use crate::types::CandidateCompany;

/// 初期化確認用プロンプト
pub const SELF_TEST_PROMPT: &str = "Say OK";

/// 初期化確認で応答に含まれるべき文字列
pub const SELF_TEST_TOKEN: &str = "OK";

/// 類似度スコア用プロンプト生成
///
/// # Arguments
/// * `target` - 比較元（ターゲット企業）の事業説明
/// * `candidate` - 比較対象企業
/// * `objective` - 買収目的などの追加指示（任意）
pub fn build_similarity_prompt(
    target: &str,
    candidate: &CandidateCompany,
    objective: Option<&str>,
) -> String {
    let objective = objective
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| format!("\n{}\n", o))
        .unwrap_or_default();

    format!(
        r#"
You are an equity research analyst evaluating comparable companies against a target company.
{objective}
Target Company Description:
{target}

Comparable Company: {name}
Comparable Company Description:
{description}

Instructions:
1. Use your internal understanding and search capability to verify the comparable company.
2. Give a similarity score from 0% to 100% with decimal precision (e.g., 91.35%).
3. After the score, write a short 1-2 line reason explaining why you gave that score.
4. Return 0% if you can't find a match and give the reason.
5. Format your response like this:
91.35%
Reason for the score.
"#,
        target = target.trim(),
        name = candidate.name,
        description = candidate.description_or_default(),
    )
}

/// 分類用プロンプト生成（バッチ単位）
///
/// 対象企業はバッチ内で1始まりの番号付きで列挙する。
pub fn build_classification_prompt(target: &str, candidates: &[CandidateCompany]) -> String {
    let company_list = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}: {}", i + 1, c.name, c.description_or_default()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
You are a business analyst tasked with analyzing companies and comparing them to a target company for potential business opportunities, partnerships, or market relevance.

**TARGET COMPANY REFERENCE:**
{target}

**COMPANIES TO ANALYZE:**
{company_list}

For each company, analyze and return the following information:

1. **Business Summary**: A clear, concise 1-2 sentence summary of what the company actually does.
2. **Industry Classification**: Primary industry/sector.
3. **Business Model**: How the company makes money.
4. **Key Products/Services**: Main products or services offered.
5. **Market Focus**: Geographic or market segment focus.
6. **Relevance Score**: A numerical score from 1.00-100.00 representing the company's relevance/similarity to the target company.
7. **Relevance Reason**: A detailed 1-2 sentence explanation for the relevance score.

**Required Response Format:**
```json
{{
  "companies": [
    {{
      "company_name": "Company Name",
      "business_summary": "Clear summary of what they do",
      "industry_classification": "Primary industry",
      "business_model": "How they make money",
      "key_products_services": "Main products/services",
      "market_focus": "Geographic/market focus",
      "relevance_score": 75.50,
      "relevance_reason": "Detailed reason comparing to target company"
    }}
  ]
}}
```

Return the companies in the same order as listed above.
IMPORTANT: The relevance_score MUST be a numeric value (like 75.50), not text or string.
"#,
        target = target.trim(),
    )
}
