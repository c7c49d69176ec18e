//! Comps AI Common Library
//!
//! CLIと各フロントエンドで共有される型・プロンプト・パーサー（IOなし）

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod report;

pub use types::{
    AnalysisMode, AnalysisResult, CandidateCompany, Classification, ResultStatus,
    NO_DESCRIPTION, UNKNOWN_COMPANY,
};
pub use error::{Error, Result};
pub use prompts::{
    build_classification_prompt, build_similarity_prompt, SELF_TEST_PROMPT, SELF_TEST_TOKEN,
};
pub use parser::{clean_relevance_score, extract_json, extract_score, parse_batch_response};
pub use report::{
    rank_results, summarize, CategoryCount, RankedCompany, RelevanceBand, ResultFilter, RunSummary,
};
