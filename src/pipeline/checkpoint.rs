//! チェックポイント書き出しとマージ
//!
//! 一定ユニットごとに蓄積結果を `<stem>_chunk_<n>.xlsx` に保存してバッファを空にする。
//! 終了時は作成順に読み戻して連結し、チェックポイントファイルを削除する。

use crate::error::Result;
use crate::spreadsheet;
use comps_ai_common::{AnalysisMode, AnalysisResult};
use std::path::{Path, PathBuf};

/// 書き出したチェックポイント
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug)]
pub struct CheckpointWriter {
    dir: PathBuf,
    stem: String,
    mode: AnalysisMode,
    written: Vec<CheckpointRecord>,
}

impl CheckpointWriter {
    pub fn new(dir: &Path, stem: &str, mode: AnalysisMode) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            mode,
            written: Vec::new(),
        }
    }

    /// 次に書き出すファイルのパス（1始まりの連番）
    pub fn next_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_chunk_{}.xlsx", self.stem, self.written.len() + 1))
    }

    /// バッファを保存して空にする
    pub fn write(&mut self, buffer: &mut Vec<AnalysisResult>) -> Result<&CheckpointRecord> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_path();
        spreadsheet::write_results(&path, buffer, self.mode)?;

        tracing::info!(path = %path.display(), rows = buffer.len(), "checkpoint saved");
        self.written.push(CheckpointRecord {
            path,
            rows: buffer.len(),
        });
        buffer.clear();

        Ok(&self.written[self.written.len() - 1])
    }

    pub fn written(&self) -> &[CheckpointRecord] {
        &self.written
    }

    /// 全チェックポイントを作成順に連結して削除する
    ///
    /// チェックポイントが無い場合は警告のみで空を返す。
    /// 2回目以降の呼び出しは何もしない。
    pub fn merge(&mut self) -> Result<Vec<AnalysisResult>> {
        if self.written.is_empty() {
            tracing::warn!(dir = %self.dir.display(), "no checkpoint files to merge");
            return Ok(Vec::new());
        }

        let mut merged = Vec::new();
        for record in &self.written {
            let (_, rows) = spreadsheet::read_results(&record.path)?;
            merged.extend(rows);
        }

        self.clear();
        Ok(merged)
    }

    /// チェックポイントファイルを削除（削除失敗は警告のみ）
    pub fn clear(&mut self) {
        for record in self.written.drain(..) {
            match std::fs::remove_file(&record.path) {
                Ok(()) => tracing::debug!(path = %record.path.display(), "checkpoint removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %record.path.display(),
                    error = %e,
                    "could not delete checkpoint"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comps_ai_common::CandidateCompany;
    use tempfile::tempdir;

    fn results(prefix: &str, n: usize) -> Vec<AnalysisResult> {
        (0..n)
            .map(|i| {
                let c = CandidateCompany::new(&format!("{}{}", prefix, i), "desc");
                AnalysisResult::scored(&c, i as f64, "reason")
            })
            .collect()
    }

    #[test]
    fn test_write_names_sequentially_and_clears_buffer() {
        let dir = tempdir().unwrap();
        let mut writer = CheckpointWriter::new(dir.path(), "matched", AnalysisMode::Similarity);

        let mut buffer = results("a", 3);
        let record = writer.write(&mut buffer).unwrap().clone();
        assert!(buffer.is_empty());
        assert_eq!(record.rows, 3);
        assert_eq!(record.path, dir.path().join("matched_chunk_1.xlsx"));
        assert_eq!(writer.next_path(), dir.path().join("matched_chunk_2.xlsx"));
    }

    #[test]
    fn test_merge_in_creation_order_and_delete() {
        let dir = tempdir().unwrap();
        let mut writer = CheckpointWriter::new(dir.path(), "matched", AnalysisMode::Similarity);

        writer.write(&mut results("first", 2)).unwrap();
        writer.write(&mut results("second", 1)).unwrap();
        let paths: Vec<PathBuf> = writer.written().iter().map(|r| r.path.clone()).collect();

        let merged = writer.merge().unwrap();
        let names: Vec<&str> = merged.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(names, vec!["first0", "first1", "second0"]);
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(writer.written().is_empty());

        // 2回目は空
        assert!(writer.merge().unwrap().is_empty());
    }

    #[test]
    fn test_merge_without_checkpoints_is_empty() {
        let dir = tempdir().unwrap();
        let mut writer = CheckpointWriter::new(dir.path(), "x", AnalysisMode::Classification);
        assert!(writer.merge().unwrap().is_empty());
    }

    #[test]
    fn test_clear_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let mut writer = CheckpointWriter::new(dir.path(), "x", AnalysisMode::Similarity);
        writer.write(&mut results("a", 1)).unwrap();
        std::fs::remove_file(&writer.written()[0].path).unwrap();

        writer.clear();
        assert!(writer.written().is_empty());
    }
}
