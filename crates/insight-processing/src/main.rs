//! CLI entry point for the insight processing pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use insight_processing::{Pipeline, PipelineConfig, PipelineResult, ReportWriter};
use std::path::Path;
use tracing::{error, info, warn};

#[cfg(feature = "ai")]
use insight_processing::ai::GeminiProvider;
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Business spreadsheet cleaning and chart selection",
    long_about = "Cleans an uploaded CSV or Excel file, infers column roles and picks \
                  charts for the business report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GEMINI_API_KEY    API key for Google Gemini (enables cleaning guidance)\n\n\
                  EXAMPLES:\n  \
                  # Clean a file and write outputs to ./output\n  \
                  insight-processing -i sales.csv\n\n  \
                  # Print the full result as JSON\n  \
                  insight-processing -i sales.xlsx --json\n\n  \
                  # Skip the advisory service\n  \
                  insight-processing -i sales.csv --no-ai"
)]
struct Args {
    /// Path to the CSV or Excel file to process
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Custom output file stem
    ///
    /// If not specified, the input file stem is used
    #[arg(long)]
    output_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Skip the advisory service
    #[arg(long, default_value = "false")]
    no_ai: bool,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Keep duplicate rows
    #[arg(long)]
    keep_duplicates: bool,

    /// Do not clip numeric outliers
    #[arg(long)]
    no_outlier_clipping: bool,

    /// Multiplier k for the outlier fences Q1 - k*IQR and Q3 + k*IQR
    #[arg(long, default_value = "1.5")]
    iqr_multiplier: f64,

    /// Number of categories shown in the bar chart
    #[arg(long, default_value = "10")]
    bar_top_n: usize,

    /// Number of slices shown in the pie chart
    #[arg(long, default_value = "8")]
    pie_top_n: usize,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON result.
    #[arg(long)]
    json: bool,

    /// Do not write output files
    #[arg(long)]
    no_write: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let input = Path::new(&args.input);
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let mut config_builder = PipelineConfig::builder()
        .output_dir(&args.output)
        .use_ai_guidance(!args.no_ai)
        .remove_duplicates(!args.keep_duplicates)
        .cap_outliers(!args.no_outlier_clipping)
        .iqr_multiplier(args.iqr_multiplier)
        .bar_top_n(args.bar_top_n)
        .pie_top_n(args.pie_top_n);

    if let Some(ref name) = args.output_name {
        config_builder = config_builder.output_name(name);
    }

    let config = config_builder.build()?;
    let writer = ReportWriter::from_config(&config);
    let pipeline = build_pipeline(&args, config)?;

    info!("Loading dataset from: {}", args.input);
    let bytes = std::fs::read(input)?;
    let filename = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&args.input);

    let result = match pipeline.process_bytes(&bytes, filename) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if !args.no_write {
        let files = writer.write_all(&result)?;
        info!("Outputs written to: {}", writer.output_dir().display());
        if !args.json {
            println!("Cleaned data: {}", files.cleaned_csv.display());
            println!("Cleaning log: {}", files.cleaning_log.display());
            println!("Charts:       {}", files.charts.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_human_readable_summary(&result);
    Ok(())
}

/// Build the pipeline, attaching Gemini when a key is available.
#[cfg(feature = "ai")]
fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = with_progress(Pipeline::builder().config(config), args.quiet);

    if args.no_ai {
        info!("Advisory guidance disabled");
        return Ok(builder.build()?);
    }

    match env::var("GEMINI_API_KEY") {
        Ok(api_key) if !api_key.trim().is_empty() => {
            info!("Running with advisory guidance (Gemini)");
            builder = builder.advisory_provider(Arc::new(GeminiProvider::new(api_key)?));
        }
        _ => warn!("GEMINI_API_KEY not set. Skipping advisory guidance."),
    }

    Ok(builder.build()?)
}

#[cfg(not(feature = "ai"))]
fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    if !args.no_ai {
        warn!("AI support not compiled in. Skipping advisory guidance.");
    }
    Ok(with_progress(Pipeline::builder().config(config), args.quiet).build()?)
}

fn with_progress(
    builder: insight_processing::PipelineBuilder,
    quiet: bool,
) -> insight_processing::PipelineBuilder {
    if quiet {
        return builder;
    }
    builder.on_progress(|update| {
        info!(
            "[{:.0}%] {}: {}",
            update.progress * 100.0,
            update.stage.display_name(),
            update.message
        );
    })
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(result: &PipelineResult) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("{}", result.report_title());
    println!("{}", result.domain.subtitle());
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Rows: {} -> {} ({} removed)",
        summary.original_shape.0, summary.final_shape.0, summary.rows_removed
    );
    println!("Columns cleaned: {}", summary.columns_cleaned);
    println!("Duration: {}ms", result.duration_ms);
    println!();

    println!("Column Roles:");
    for (name, role) in result.roles.iter() {
        println!("  {:<24} {}", name, role);
    }
    println!();

    let actions = result.log.actions_taken();
    if !actions.is_empty() {
        println!("Actions Taken:");
        for action in actions.iter().take(10) {
            println!("  - {}", action);
        }
        if actions.len() > 10 {
            println!("  ... and {} more actions", actions.len() - 10);
        }
        println!();
    }

    if !result.charts.is_empty() {
        println!("Charts:");
        for chart in &result.charts {
            println!("  [{:?}] {}", chart.chart_type, chart.title);
        }
        println!();
    }

    if let Some(ref guidance) = result.guidance {
        println!("Guidance:");
        println!("{}", guidance);
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
