pub mod reader;
pub mod writer;

pub use reader::{read_candidates, read_results};
pub use writer::{write_csv, write_report, write_results};

/// 分類モードの全件シート名
pub const ALL_SHEET: &str = "All_Companies";
