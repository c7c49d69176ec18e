use clap::Parser;
use comps_ai_common::{summarize, AnalysisMode, AnalysisResult, CategoryCount, ResultFilter};
use comps_ai_rust::{cli, config, error, model, pipeline, spreadsheet};
use cli::{Cli, Commands, OutputFormat, RunArgs};
use config::Config;
use error::{CompsAiError, Result};
use model::{ApiKeyPool, GeminiClient, ModelSession};
use pipeline::retry::RetryPolicy;
use pipeline::{Pipeline, PipelineSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// score / classify のモード固有オプション
#[derive(Default)]
struct ModeOptions {
    batch_size: Option<usize>,
    key_usage_limit: Option<usize>,
    csv: bool,
    objective: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Score { input, run, objective } => {
            println!("📊 comps-ai - similarity scoring\n");
            let options = ModeOptions {
                objective,
                ..Default::default()
            };
            run_analysis(AnalysisMode::Similarity, &input, &run, config, options).await?;
        }

        Commands::Classify { input, run, batch_size, key_usage_limit, csv } => {
            println!("🏷  comps-ai - business classification\n");
            let options = ModeOptions {
                batch_size,
                key_usage_limit,
                csv,
                objective: None,
            };
            run_analysis(AnalysisMode::Classification, &input, &run, config, options).await?;
        }

        Commands::Filter { input, min_score, industry, format, output } => {
            println!("🔎 comps-ai - filter results\n");

            let (mode, results) = spreadsheet::read_results(&input)?;
            println!("✔ {} rows loaded ({})", results.len(), mode.label());

            let filter = ResultFilter {
                min_score,
                industries: industry,
            };
            let filtered = filter.apply(&results);
            println!("✔ {} rows match\n", filtered.len());

            if filtered.is_empty() {
                println!("⚠ No rows match the filter, nothing written");
                return Ok(());
            }

            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!("filtered_results_{}.{}", timestamp(), format.extension()))
            });
            match format {
                OutputFormat::Csv => spreadsheet::write_csv(&output, &filtered, mode)?,
                OutputFormat::Excel => spreadsheet::write_results(&output, &filtered, mode)?,
            }
            println!("✔ Saved: {}", output.display());
        }

        Commands::Config {
            add_key,
            prompt_key,
            remove_key,
            clear_keys,
            model,
            key_usage_limit,
            batch_size,
            show,
        } => {
            let mut config = config;
            let mut changed = false;

            if clear_keys {
                config.api_keys.clear();
                changed = true;
                println!("✔ Removed all stored API keys");
            }

            if let Some(number) = remove_key {
                let removed = config.remove_api_key(number)?;
                changed = true;
                println!("✔ Removed API key #{} ({})", number, config::mask_key(&removed));
            }

            let mut new_keys: Vec<String> = add_key.into_iter().collect();
            if prompt_key {
                let key = dialoguer::Password::new()
                    .with_prompt("Gemini API key")
                    .interact()
                    .map_err(|e| CompsAiError::Config(format!("input error: {}", e)))?;
                new_keys.push(key);
            }
            for key in new_keys {
                if config.add_api_key(&key) {
                    changed = true;
                    println!("✔ Added API key {}", config::mask_key(key.trim()));
                } else {
                    println!("⚠ Key is empty or already stored, skipped");
                }
            }

            if let Some(model) = model {
                config.model = model;
                changed = true;
            }
            if let Some(limit) = key_usage_limit {
                config.key_usage_limit = limit;
                changed = true;
            }
            if let Some(size) = batch_size {
                config.batch_size = size;
                changed = true;
            }

            if changed {
                config.validate()?;
                config.save()?;
                println!("✔ Saved: {}", Config::config_path()?.display());
            }

            if show || !changed {
                print_config(&config);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_analysis(
    mode: AnalysisMode,
    input: &Path,
    run: &RunArgs,
    mut config: Config,
    options: ModeOptions,
) -> Result<()> {
    // 実行時オプションで設定を上書き
    if let Some(size) = options.batch_size {
        config.batch_size = size;
    }
    if let Some(limit) = options.key_usage_limit {
        config.key_usage_limit = limit;
    }
    if let Some(every) = run.checkpoint_every {
        config.checkpoint_interval = every;
    }
    if let Some(retries) = run.max_retries {
        config.max_retries = retries;
    }
    config.validate()?;

    let target = resolve_target(run)?;

    // 1. 入力読み込み
    println!("[1/4] Reading {}...", input.display());
    let candidates = spreadsheet::read_candidates(input)?;
    println!("✔ {} companies loaded\n", candidates.len());

    if candidates.is_empty() {
        println!("⚠ No companies in the input, nothing to analyze");
        return Ok(());
    }

    // 2. モデル接続（最初のキーで初期化チェック）
    println!("[2/4] Connecting to {}...", config.model);
    let pool = ApiKeyPool::new(config.resolve_api_keys()?, config.key_usage_limit)?;
    let client = GeminiClient::new(&config.model, config.timeout_seconds)?;
    let session = ModelSession::connect(client, pool).await?;
    println!("✔ Model ready ({} API keys)\n", session.pool().len());

    let output = run.output.clone().unwrap_or_else(|| default_output(mode));
    let checkpoint_dir = run
        .checkpoint_dir
        .clone()
        .unwrap_or_else(|| parent_dir(&output));

    let mut settings = match mode {
        AnalysisMode::Similarity => PipelineSettings::similarity(&checkpoint_dir),
        AnalysisMode::Classification => {
            PipelineSettings::classification(&checkpoint_dir, config.batch_size)
        }
    };
    settings.checkpoint_interval = config.checkpoint_interval;
    let delay = run
        .retry_delay
        .map(Duration::from_secs)
        .unwrap_or(settings.retry.delay);
    settings.retry = RetryPolicy::new(config.max_retries, delay);
    settings.objective = options.objective;

    // 3. 解析
    println!("[3/4] Analyzing ({})...", mode.label());
    let mut pipeline = Pipeline::new(session, settings).with_progress();
    let report = pipeline.run(&target, &candidates).await?;
    println!(
        "✔ {} rows from {} checkpoints ({} model calls)\n",
        report.results.len(),
        report.checkpoints.len(),
        report.model_calls
    );

    if report.results.is_empty() {
        println!("⚠ No results to save");
        return Ok(());
    }

    // 4. 出力
    println!("[4/4] Saving...");
    spreadsheet::write_report(&output, &report.results, mode)?;
    println!("✔ Saved: {}", output.display());

    if options.csv {
        let csv_path = output.with_extension("csv");
        spreadsheet::write_csv(&csv_path, &report.results, mode)?;
        println!("✔ Saved: {}", csv_path.display());
    }

    print_summary(&report.results);
    println!("\n✅ Done");
    Ok(())
}

/// フラグ > ファイル > 対話入力 の順でターゲット説明を決める
fn resolve_target(run: &RunArgs) -> Result<String> {
    let target = if let Some(target) = &run.target {
        target.clone()
    } else if let Some(path) = &run.target_file {
        if !path.exists() {
            return Err(CompsAiError::FileNotFound(path.display().to_string()));
        }
        std::fs::read_to_string(path)?
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt("Target company business description")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| CompsAiError::Config(format!("input error: {}", e)))?
    };

    let target = target.trim();
    if target.is_empty() {
        return Err(CompsAiError::EmptyTarget);
    }
    Ok(target.to_string())
}

fn default_output(mode: AnalysisMode) -> PathBuf {
    match mode {
        AnalysisMode::Similarity => PathBuf::from("matched_comparables.xlsx"),
        AnalysisMode::Classification => {
            PathBuf::from(format!("business_classifications_{}.xlsx", timestamp()))
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn print_summary(results: &[AnalysisResult]) {
    let summary = summarize(results);
    println!("\nSummary:");
    println!("  Companies: {}", summary.total);
    println!("  Failed: {}", summary.failed);
    println!("  Mean score: {:.2}", summary.mean_score);
    for band in &summary.bands {
        println!(
            "  {}: {} (mean {:.2})",
            band.band.label(),
            band.count,
            band.mean_score
        );
    }

    println!("\nTop companies:");
    for (i, company) in summary.top_companies.iter().enumerate() {
        if company.industry.is_empty() {
            println!("  {:>2}. {} ({:.2})", i + 1, company.company_name, company.relevance_score);
        } else {
            println!(
                "  {:>2}. {} ({:.2}, {})",
                i + 1,
                company.company_name,
                company.relevance_score,
                company.industry
            );
        }
    }

    // 分布は分類モードのみ
    print_counts("Industries", &summary.industries);
    print_counts("Business models", &summary.business_models);
}

fn print_counts(title: &str, counts: &[CategoryCount]) {
    if counts.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for entry in counts {
        println!("  {}: {}", entry.label, entry.count);
    }
}

fn print_config(config: &Config) {
    println!("Config:");
    println!("  Model: {}", config.model);
    println!("  Key usage limit: {}", config.key_usage_limit);
    println!("  Batch size: {}", config.batch_size);
    println!("  Checkpoint every: {}", config.checkpoint_interval);
    println!("  Max retries: {}", config.max_retries);
    println!("  Timeout: {}s", config.timeout_seconds);
    if config.api_keys.is_empty() {
        println!("  API keys: not set");
    } else {
        println!("  API keys:");
        for (i, key) in config.api_keys.iter().enumerate() {
            println!("    {}. {}", i + 1, config::mask_key(key));
        }
    }
}
