// src/main.rs
// =============================================================================
// Entry point of the link-sentinel CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr so stdout stays clean for --json)
// 3. Build the seed list and engine config, run the checker
// 4. Print / write the report
// 5. Exit with 0 = all links fine, 1 = problems found, 2 = fatal error
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, EngineArgs, OutputArgs};
use link_sentinel::checker::Checker;
use link_sentinel::config::{SeedPage, SeedsFile};
use link_sentinel::report::{self, ReportModel};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = no problems
//   Ok(1) = broken links or unreachable seeds
//   Err   = bad configuration or output failure (exit code 2)
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            seeds,
            output,
            engine,
        } => {
            let file = SeedsFile::load(&seeds)?;
            info!(seeds = file.seeds.len(), path = %seeds.display(), "loaded seeds file");
            check(file.seeds, file.skip_domains, &engine, &output).await
        }
        Commands::Page {
            url,
            label,
            skip_domains,
            output,
            engine,
        } => {
            let seed = SeedPage::new(label.unwrap_or_else(|| url.clone()), url).with_skip_domains(skip_domains);
            seed.validate()?;
            check(vec![seed], Vec::new(), &engine, &output).await
        }
    }
}

async fn check(
    seeds: Vec<SeedPage>,
    skip_domains: Vec<String>,
    engine: &EngineArgs,
    output: &OutputArgs,
) -> Result<i32> {
    let config = engine.to_config(skip_domains);
    let checker = Checker::new(config).context("invalid checker configuration")?;

    let report = checker.run(&seeds).await;
    emit(&report, output)?;

    if report.is_partial() {
        info!("some seed pages were unreachable, report covers the rest");
    }

    Ok(if report.has_problems() { 1 } else { 0 })
}

fn emit(report: &ReportModel, output: &OutputArgs) -> Result<()> {
    if output.json {
        println!("{}", report::to_json(report)?);
    } else {
        report::print_table(report);
    }

    if let Some(path) = &output.html {
        std::fs::write(path, report::render_html(report))
            .with_context(|| format!("could not write HTML report to {}", path.display()))?;
        info!(path = %path.display(), "HTML report written");
    }

    Ok(())
}
