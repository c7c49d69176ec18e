//! バッチパイプライン
//!
//! Idle → Processing(i/N) → Checkpointing → Processing(i+1) … → Merging → Done
//!
//! 1ユニットずつ逐次処理する。類似度モードは1社、分類モードは batch_size 社が1ユニット。
//! 一定ユニットごとに結果をチェックポイントへ書き出し、最後に連結して順位付けする。

pub mod checkpoint;
pub mod retry;

use crate::error::{CompsAiError, Result};
use crate::model::{ModelSession, TextModel};
use checkpoint::{CheckpointRecord, CheckpointWriter};
use comps_ai_common::{
    build_classification_prompt, build_similarity_prompt, extract_score, parse_batch_response,
    rank_results, AnalysisMode, AnalysisResult, CandidateCompany,
};
use indicatif::{ProgressBar, ProgressStyle};
use retry::{RetryController, RetryPolicy, CLASSIFICATION_RETRY_DELAY, SIMILARITY_RETRY_DELAY};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Processing { unit: usize, total: usize },
    Checkpointing,
    Merging,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Processing { unit, total } => write!(f, "processing {}/{}", unit, total),
            PipelineState::Checkpointing => write!(f, "checkpointing"),
            PipelineState::Merging => write!(f, "merging"),
            PipelineState::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: AnalysisMode,
    /// 分類モードの1バッチの社数（類似度モードでは無視）
    pub batch_size: usize,
    pub checkpoint_interval: usize,
    pub retry: RetryPolicy,
    pub unit_pause: Duration,
    pub checkpoint_pause: Duration,
    pub checkpoint_dir: PathBuf,
    pub checkpoint_stem: String,
    /// 類似度プロンプトに添える分析目的
    pub objective: Option<String>,
}

impl PipelineSettings {
    pub fn similarity(checkpoint_dir: &Path) -> Self {
        Self {
            mode: AnalysisMode::Similarity,
            batch_size: 1,
            checkpoint_interval: 10,
            retry: RetryPolicy::new(3, SIMILARITY_RETRY_DELAY),
            unit_pause: Duration::from_secs(1),
            checkpoint_pause: Duration::from_secs(5),
            checkpoint_dir: checkpoint_dir.to_path_buf(),
            checkpoint_stem: "matched".into(),
            objective: None,
        }
    }

    pub fn classification(checkpoint_dir: &Path, batch_size: usize) -> Self {
        Self {
            mode: AnalysisMode::Classification,
            batch_size: batch_size.max(1),
            retry: RetryPolicy::new(3, CLASSIFICATION_RETRY_DELAY),
            checkpoint_stem: "classification".into(),
            ..Self::similarity(checkpoint_dir)
        }
    }

    /// 待機をすべて0にする
    pub fn without_pauses(mut self) -> Self {
        self.unit_pause = Duration::ZERO;
        self.checkpoint_pause = Duration::ZERO;
        self.retry.delay = Duration::ZERO;
        self
    }

    fn unit_size(&self) -> usize {
        match self.mode {
            AnalysisMode::Similarity => 1,
            AnalysisMode::Classification => self.batch_size.max(1),
        }
    }
}

/// 実行結果
#[derive(Debug)]
pub struct PipelineReport {
    /// 連結・順位付け済みの全結果
    pub results: Vec<AnalysisResult>,
    /// 書き出したチェックポイント（マージ後は削除済み）
    pub checkpoints: Vec<CheckpointRecord>,
    pub units: usize,
    pub model_calls: usize,
}

pub struct Pipeline<M> {
    session: ModelSession<M>,
    settings: PipelineSettings,
    retry: RetryController,
    state: PipelineState,
    progress: ProgressBar,
}

impl<M: TextModel> Pipeline<M> {
    pub fn new(session: ModelSession<M>, settings: PipelineSettings) -> Self {
        let retry = RetryController::new(settings.retry);
        Self {
            session,
            settings,
            retry,
            state: PipelineState::Idle,
            progress: ProgressBar::hidden(),
        }
    }

    /// 進捗バーを表示する
    pub fn with_progress(mut self) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        self.progress = ProgressBar::new(0);
        self.progress.set_style(style);
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn session(&self) -> &ModelSession<M> {
        &self.session
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    /// 全候補を処理してチェックポイントを連結する
    pub async fn run(
        &mut self,
        target: &str,
        candidates: &[CandidateCompany],
    ) -> Result<PipelineReport> {
        let target = target.trim();
        if target.is_empty() {
            return Err(CompsAiError::EmptyTarget);
        }

        let units: Vec<&[CandidateCompany]> =
            candidates.chunks(self.settings.unit_size()).collect();
        let total = units.len();
        let interval = self.settings.checkpoint_interval.max(1);

        let mut writer = CheckpointWriter::new(
            &self.settings.checkpoint_dir,
            &self.settings.checkpoint_stem,
            self.settings.mode,
        );
        let mut buffer: Vec<AnalysisResult> = Vec::new();
        let mut since_checkpoint = 0;

        tracing::info!(
            mode = self.settings.mode.label(),
            candidates = candidates.len(),
            units = total,
            "pipeline started"
        );
        self.progress.set_length(total as u64);
        self.progress.set_message(self.settings.mode.label());

        for (index, batch) in units.iter().enumerate() {
            let unit = index + 1;
            self.transition(PipelineState::Processing { unit, total });

            let results = self.process_unit(target, batch, unit, total).await;
            for result in &results {
                tracing::debug!(
                    company = %result.company_name,
                    score = %result.score_label(),
                    "unit result"
                );
            }
            buffer.extend(results);
            since_checkpoint += 1;
            self.progress.inc(1);

            let is_last = unit == total;
            if since_checkpoint >= interval || is_last {
                self.transition(PipelineState::Checkpointing);
                let record = writer.write(&mut buffer)?;
                self.progress.println(format!(
                    "💾 checkpoint {} ({} rows)",
                    record.path.display(),
                    record.rows
                ));
                since_checkpoint = 0;
                if !is_last {
                    pause(self.settings.checkpoint_pause).await;
                }
            } else {
                pause(self.settings.unit_pause).await;
            }
        }

        let checkpoints = writer.written().to_vec();
        self.transition(PipelineState::Merging);
        let merged = writer.merge()?;
        let results = rank_results(merged);

        self.transition(PipelineState::Done);
        self.progress.finish_and_clear();
        tracing::info!(
            rows = results.len(),
            checkpoints = checkpoints.len(),
            model_calls = self.session.calls(),
            "pipeline finished"
        );

        Ok(PipelineReport {
            results,
            checkpoints,
            units: total,
            model_calls: self.session.calls(),
        })
    }

    /// 1ユニットを処理（リトライを使い切ったら失敗行を返す）
    async fn process_unit(
        &mut self,
        target: &str,
        batch: &[CandidateCompany],
        unit: usize,
        total: usize,
    ) -> Vec<AnalysisResult> {
        let label = format!("{}/{}", unit, total);
        let session = &mut self.session;

        match self.settings.mode {
            AnalysisMode::Similarity => {
                let candidate = &batch[0];
                let prompt = build_similarity_prompt(
                    target,
                    candidate,
                    self.settings.objective.as_deref(),
                );
                let result = self
                    .retry
                    .run_or_else(
                        &label,
                        async || {
                            let response = session.generate(&prompt).await?;
                            tracing::debug!(unit = %label, %response, "model response");
                            let (score, reason) = extract_score(&response);
                            Ok(AnalysisResult::scored(candidate, score, reason))
                        },
                        |_| AnalysisResult::failed(candidate),
                    )
                    .await;
                vec![result]
            }
            AnalysisMode::Classification => {
                let prompt = build_classification_prompt(target, batch);
                self.retry
                    .run_or_else(
                        &label,
                        async || {
                            let response = session.generate(&prompt).await?;
                            tracing::debug!(unit = %label, %response, "model response");
                            Ok(parse_batch_response(&response, batch)?)
                        },
                        |e| {
                            let error = e.to_string();
                            batch
                                .iter()
                                .map(|c| AnalysisResult::batch_failed(c, &error))
                                .collect()
                        },
                    )
                    .await
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
