use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comps-ai")]
#[command(about = "比較対象企業のAIスクリーニング・事業分類ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 1社ずつ類似度スコア（0-100%）と理由を付ける
    Score {
        /// 入力スプレッドシート（"Company Name" / "Business Description" 列）
        #[arg(required = true)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// 分析目的（プロンプトに添える）
        #[arg(long)]
        objective: Option<String>,
    },

    /// バッチ単位で事業分類と関連度スコアを付ける
    Classify {
        /// 入力スプレッドシート
        #[arg(required = true)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// 1回のAPI呼び出しで分類する社数
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// 1キーあたりの呼び出し回数上限
        #[arg(long)]
        key_usage_limit: Option<usize>,

        /// CSVも出力する
        #[arg(long)]
        csv: bool,
    },

    /// 出力済みの結果をスコア・業種で絞り込む
    Filter {
        /// 結果ファイル（score/classify の出力）
        #[arg(required = true)]
        input: PathBuf,

        /// 最低スコア
        #[arg(long, default_value = "0")]
        min_score: f64,

        /// 業種（複数指定可、大文字小文字は区別しない）
        #[arg(long)]
        industry: Vec<String>,

        /// 出力形式 (csv/excel)
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,

        /// 出力ファイル
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを追加
        #[arg(long)]
        add_key: Option<String>,

        /// APIキーを非表示入力で追加
        #[arg(long)]
        prompt_key: bool,

        /// APIキーを番号（1始まり）で削除
        #[arg(long)]
        remove_key: Option<usize>,

        /// 保存済みAPIキーをすべて削除
        #[arg(long)]
        clear_keys: bool,

        /// 使用モデル
        #[arg(long)]
        model: Option<String>,

        /// 1キーあたりの呼び出し回数上限
        #[arg(long)]
        key_usage_limit: Option<usize>,

        /// 分類モードのバッチサイズ
        #[arg(long)]
        batch_size: Option<usize>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// score / classify 共通の実行オプション
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// ターゲット企業の事業説明
    #[arg(short, long)]
    pub target: Option<String>,

    /// ターゲット企業の事業説明をファイルから読む
    #[arg(long, conflicts_with = "target")]
    pub target_file: Option<PathBuf>,

    /// 出力ファイル
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 何ユニットごとにチェックポイントを書くか
    #[arg(long)]
    pub checkpoint_every: Option<usize>,

    /// チェックポイントの保存先（省略時は出力先と同じフォルダ）
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// 1ユニットの最大試行回数
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// 試行間隔（秒）
    #[arg(long)]
    pub retry_delay: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Excel,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Excel => "xlsx",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "excel" | "xlsx" => Ok(OutputFormat::Excel),
            _ => Err(format!("Unknown format: {}. Use csv or excel", s)),
        }
    }
}
