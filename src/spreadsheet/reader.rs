//! スプレッドシート読み込み（calamine）
//!
//! - 入力: "Company Name" / "Business Description" 列を持つ最初のシート
//! - チェックポイント・最終出力の読み戻し（マージ・絞込み用）

use crate::error::{CompsAiError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use comps_ai_common::parser::clean_score_text;
use comps_ai_common::types::{ERROR_SCORE_LABEL, PROCESSING_FAILED};
use comps_ai_common::{AnalysisMode, AnalysisResult, CandidateCompany, Classification, ResultStatus};
use std::path::Path;

pub const NAME_COLUMN: &str = "Company Name";
pub const DESCRIPTION_COLUMN: &str = "Business Description";

/// ヘッダー行とデータ行
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.column(n).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CompsAiError::MissingColumns(missing.join(", ")));
        }
        Ok(names.iter().filter_map(|n| self.column(n)).collect())
    }
}

fn read_table(path: &Path, preferred_sheet: Option<&str>) -> Result<Table> {
    if !path.exists() {
        return Err(CompsAiError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| CompsAiError::ExcelRead(format!("{}: {}", path.display(), e)))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = preferred_sheet
        .and_then(|wanted| sheet_names.iter().find(|s| s.as_str() == wanted))
        .or_else(|| sheet_names.first())
        .cloned()
        .ok_or_else(|| CompsAiError::ExcelRead(format!("workbook has no sheets: {}", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CompsAiError::ExcelRead(format!("{} / {}: {}", path.display(), sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => Vec::new(),
    };

    let rows = rows_iter
        .filter(|row| row.iter().any(|c| !cell_to_string(c).is_empty()))
        .map(|row| row.to_vec())
        .collect();

    Ok(Table { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_at(row: &[Data], index: usize) -> String {
    row.get(index).map(cell_to_string).unwrap_or_default()
}

/// 入力スプレッドシートから比較対象企業を読み込む
///
/// 空欄の企業名は "Unknown"、空欄の事業説明は既定文言に置き換える。
pub fn read_candidates(path: &Path) -> Result<Vec<CandidateCompany>> {
    let table = read_table(path, None)?;
    let columns = table.require(&[NAME_COLUMN, DESCRIPTION_COLUMN])?;
    let (name_col, desc_col) = (columns[0], columns[1]);

    let candidates = table
        .rows
        .iter()
        .map(|row| CandidateCompany::new(&cell_at(row, name_col), &cell_at(row, desc_col)))
        .collect();

    Ok(candidates)
}

/// ヘッダーから出力形式を判定
pub fn detect_mode(headers: &[String]) -> AnalysisMode {
    if headers.iter().any(|h| h == "Industry Classification") {
        AnalysisMode::Classification
    } else {
        AnalysisMode::Similarity
    }
}

/// 出力（またはチェックポイント）ファイルを読み戻す
///
/// 複数シートがある場合は "All_Companies" を優先する。
pub fn read_results(path: &Path) -> Result<(AnalysisMode, Vec<AnalysisResult>)> {
    let table = read_table(path, Some(super::ALL_SHEET))?;
    let mode = detect_mode(&table.headers);
    let columns = table.require(mode.columns())?;

    let results = table
        .rows
        .iter()
        .map(|row| {
            let text = |i: usize| cell_at(row, columns[i]);
            match mode {
                AnalysisMode::Similarity => {
                    let (score, status) = score_cell(row.get(columns[2]));
                    AnalysisResult {
                        company_name: text(0),
                        original_description: text(1),
                        relevance_score: score,
                        relevance_reason: text(3),
                        classification: None,
                        status,
                    }
                }
                AnalysisMode::Classification => {
                    let (score, _) = score_cell(row.get(columns[7]));
                    let classification = Classification {
                        business_summary: text(2),
                        industry: text(3),
                        business_model: text(4),
                        key_products_services: text(5),
                        market_focus: text(6),
                    };
                    let status = if classification.business_summary == PROCESSING_FAILED {
                        ResultStatus::Failed
                    } else {
                        ResultStatus::Scored
                    };
                    AnalysisResult {
                        company_name: text(0),
                        original_description: text(1),
                        relevance_score: score,
                        relevance_reason: text(8),
                        classification: Some(classification),
                        status,
                    }
                }
            }
        })
        .collect();

    Ok((mode, results))
}

fn score_cell(cell: Option<&Data>) -> (f64, ResultStatus) {
    match cell {
        Some(Data::Float(f)) => (*f, ResultStatus::Scored),
        Some(Data::Int(i)) => (*i as f64, ResultStatus::Scored),
        Some(Data::String(s)) if s.trim() == ERROR_SCORE_LABEL => (0.0, ResultStatus::Failed),
        Some(Data::String(s)) => (clean_score_text(s), ResultStatus::Scored),
        _ => (0.0, ResultStatus::Scored),
    }
}
