pub mod chart;
pub mod cli;
pub mod correlation;
pub mod data;
pub mod generate;
pub mod insight;
pub mod intent;
pub mod llm;
pub mod loader;
pub mod resolve;
pub mod shape;
pub mod summary;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{AnalyzeArgs, AskArgs, Cli, Commands, ProbeArgs};
use crate::data::Dataset;
use crate::generate::Analyzer;
use crate::llm::OfflineModel;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datasight", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Ask(args) => handle_ask(&args),
    }
}

fn load_dataset(input: &Path, delimiter: Option<u8>) -> Result<Dataset> {
    let delimiter = loader::resolve_input_delimiter(input, delimiter);
    loader::load_csv(input, delimiter).with_context(|| format!("Loading dataset from {input:?}"))
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    let dataset = load_dataset(&args.input, args.delimiter)?;
    let summary = summary::summarize(&dataset);
    let (headers, rows) = table::summary_rows(&summary);
    table::print_table(&headers, &rows);
    info!(
        "Profiled {} column(s) across {} row(s) in '{}'",
        summary.column_count,
        summary.row_count,
        args.input.display()
    );
    Ok(())
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let dataset = load_dataset(&args.input, args.delimiter)?;
    let model = OfflineModel;
    let analysis = Analyzer::new(&dataset, &model).analyze_upload()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }
    let (headers, rows) = table::summary_rows(&analysis.summary);
    table::print_table(&headers, &rows);
    println!();
    for chart in &analysis.charts {
        println!(
            "- {} [{}] {} point(s)",
            chart.title,
            chart_label(chart),
            chart.data.len()
        );
        if let Some(key_insight) = &chart.key_insight {
            println!("  {key_insight}");
        }
    }
    info!("Proposed {} chart(s)", analysis.charts.len());
    Ok(())
}

fn handle_ask(args: &AskArgs) -> Result<()> {
    let dataset = load_dataset(&args.input, args.delimiter)?;
    let model = OfflineModel;
    let answer = Analyzer::new(&dataset, &model).answer_question(&args.question)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }
    println!("{}", answer.answer);
    if !answer.correlations.is_empty() {
        println!();
        let (headers, rows) = table::correlation_rows(&answer.correlations);
        table::print_table(&headers, &rows);
        println!();
    }
    for chart in &answer.charts {
        println!(
            "- {} [{}] {} point(s)",
            chart.title,
            chart_label(chart),
            chart.data.len()
        );
        if let Some(key_insight) = &chart.key_insight {
            println!("  {key_insight}");
        }
    }
    Ok(())
}

fn chart_label(chart: &chart::ChartSpec) -> String {
    format!("{:?}", chart.chart_type).to_lowercase()
}
