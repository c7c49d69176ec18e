//! スプレッドシート出力（rust_xlsxwriter / csv）
//!
//! - write_results: 1シートのみ（チェックポイント・類似度モード最終出力）
//! - write_report: 分類モード最終出力（全件＋関連度帯ごとのシート）
//! - write_csv: 区切りテキスト出力

use super::ALL_SHEET;
use crate::error::{CompsAiError, Result};
use comps_ai_common::report::partition_band;
use comps_ai_common::{AnalysisMode, AnalysisResult, RelevanceBand};
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use std::path::Path;

/// 類似度モード・チェックポイントのシート名
pub const RESULTS_SHEET: &str = "Results";

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> CompsAiError {
    CompsAiError::ExcelGeneration(e.to_string())
}

/// Excelの1セルに入る最大文字数
pub const EXCEL_MAX_CELL_CHARS: usize = 32_767;

/// セル上限を超える文字列を切り詰める
fn excel_text(value: &str) -> &str {
    match value.char_indices().nth(EXCEL_MAX_CELL_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

/// 列幅（文字数単位）
fn column_width(header: &str) -> f64 {
    match header {
        "Company Name" => 32.0,
        "Business Description" | "Original Business Description" => 60.0,
        "Reason for Score" | "Relevance Reason" | "Business Summary" => 50.0,
        "Similarity Score (%)" | "Relevance Score" => 14.0,
        _ => 24.0,
    }
}

fn add_results_sheet(
    workbook: &mut Workbook,
    sheet_name: &str,
    results: &[&AnalysisResult],
    mode: AnalysisMode,
) -> Result<()> {
    let header_format = Format::new()
        .set_bold()
        .set_background_color(0xD9E1F2)
        .set_align(FormatAlign::Center);
    let text_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let score_format = Format::new().set_num_format("0.00").set_align(FormatAlign::Top);

    let columns = mode.columns();
    let score_col = columns
        .iter()
        .position(|c| *c == "Similarity Score (%)" || *c == "Relevance Score")
        .unwrap_or(usize::MAX);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(xlsx_err)?;

    for (col, header) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_err)?;
        worksheet
            .set_column_width(col as u16, column_width(header))
            .map_err(xlsx_err)?;
    }
    worksheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;

    for (i, result) in results.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in result.to_row(mode).into_iter().enumerate() {
            let col_num = col as u16;
            if col == score_col && !(result.is_failed() && mode == AnalysisMode::Similarity) {
                worksheet
                    .write_number_with_format(row, col_num, result.relevance_score, &score_format)
                    .map_err(xlsx_err)?;
            } else {
                worksheet
                    .write_string_with_format(row, col_num, excel_text(&value), &text_format)
                    .map_err(xlsx_err)?;
            }
        }
    }

    Ok(())
}

/// 1シートに結果を書き出す
pub fn write_results(path: &Path, results: &[AnalysisResult], mode: AnalysisMode) -> Result<()> {
    let mut workbook = Workbook::new();
    let rows: Vec<&AnalysisResult> = results.iter().collect();
    let sheet_name = match mode {
        AnalysisMode::Similarity => RESULTS_SHEET,
        AnalysisMode::Classification => ALL_SHEET,
    };
    add_results_sheet(&mut workbook, sheet_name, &rows, mode)?;
    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

/// 最終レポートを書き出す
///
/// 分類モードは全件シートに加え、関連度帯ごとのシートを（該当がある場合のみ）追加する。
/// 帯分けは表示用で、データ自体は変更しない。
pub fn write_report(path: &Path, results: &[AnalysisResult], mode: AnalysisMode) -> Result<()> {
    if mode == AnalysisMode::Similarity {
        return write_results(path, results, mode);
    }

    let mut workbook = Workbook::new();
    let all: Vec<&AnalysisResult> = results.iter().collect();
    add_results_sheet(&mut workbook, ALL_SHEET, &all, mode)?;

    for band in RelevanceBand::ALL {
        let rows = partition_band(results, band);
        if !rows.is_empty() {
            add_results_sheet(&mut workbook, band.sheet_name(), &rows, mode)?;
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

/// CSVで書き出す
pub fn write_csv(path: &Path, results: &[AnalysisResult], mode: AnalysisMode) -> Result<()> {
    let csv_err = |e: csv::Error| CompsAiError::CsvExport(e.to_string());

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(mode.columns()).map_err(csv_err)?;
    for result in results {
        writer.write_record(result.to_row(mode)).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::reader::read_results;
    use calamine::{open_workbook_auto, Reader};
    use comps_ai_common::{CandidateCompany, Classification};
    use tempfile::tempdir;

    #[test]
    fn test_excel_text_truncates_long_values() {
        let long = "あ".repeat(EXCEL_MAX_CELL_CHARS + 10);
        assert_eq!(excel_text(&long).chars().count(), EXCEL_MAX_CELL_CHARS);
        assert_eq!(excel_text("short"), "short");
    }

    #[test]
    fn test_write_results_with_oversized_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.xlsx");
        let candidate = CandidateCompany::new("Verbose Co", "desc");
        let results = vec![AnalysisResult::scored(&candidate, 55.0, "x".repeat(40_000))];

        write_results(&path, &results, AnalysisMode::Similarity).unwrap();
        let (_, rows) = read_results(&path).unwrap();
        assert_eq!(rows[0].relevance_reason.len(), EXCEL_MAX_CELL_CHARS);
        assert_eq!(rows[0].relevance_score, 55.0);
    }

    fn classified(name: &str, score: f64) -> AnalysisResult {
        AnalysisResult::classified(
            &CandidateCompany::new(name, "desc"),
            Classification {
                business_summary: "summary".into(),
                industry: "Agribusiness".into(),
                business_model: "B2B".into(),
                key_products_services: "Oil".into(),
                market_focus: "India".into(),
            },
            score,
            "reason",
        )
    }

    #[test]
    fn test_similarity_round_trip_keeps_error_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let a = CandidateCompany::new("Alpha", "");
        let b = CandidateCompany::new("Beta", "Crushes oilseeds");
        let results = vec![
            AnalysisResult::scored(&a, 81.25, "Close match"),
            AnalysisResult::failed(&b),
        ];

        write_results(&path, &results, AnalysisMode::Similarity).unwrap();
        let (mode, loaded) = read_results(&path).unwrap();

        assert_eq!(mode, AnalysisMode::Similarity);
        assert_eq!(loaded, results);
        assert_eq!(loaded[0].original_description, comps_ai_common::NO_DESCRIPTION);
    }

    #[test]
    fn test_classification_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let failed = AnalysisResult::batch_failed(&CandidateCompany::new("Gamma", "x"), "503");
        let results = vec![classified("Alpha", 75.5), failed];

        write_results(&path, &results, AnalysisMode::Classification).unwrap();
        let (mode, loaded) = read_results(&path).unwrap();

        assert_eq!(mode, AnalysisMode::Classification);
        assert_eq!(loaded, results);
        assert!(loaded[1].is_failed());
    }

    #[test]
    fn test_report_creates_band_sheets_only_when_populated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let results = vec![classified("A", 90.0), classified("B", 20.0), classified("C", 10.0)];

        write_report(&path, &results, AnalysisMode::Classification).unwrap();

        let workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["All_Companies", "High_Relevance_70+", "Low_Relevance_0-49"]
        );

        // 全件シートが優先して読まれる
        let (_, loaded) = read_results(&path).unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let results = vec![classified("Alpha, Inc.", 60.0)];

        write_csv(&path, &results, AnalysisMode::Classification).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Company Name,Original Business Description"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Alpha, Inc.\",desc,summary,Agribusiness"));
        assert!(row.contains("60.00"));
    }
}
