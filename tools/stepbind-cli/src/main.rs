use anyhow::Context;
use clap::{Parser, Subcommand};
use cluster_probe::TestConfig;
use run_report::ResultLog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use step_library::{standard_registry, ClusterSteps};
use step_registry::{load_features, suggest_expression, Feature, ScenarioRunner, StepRegistry};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepbind")]
#[command(about = "stepbind CLI - Run Gherkin scenarios against registered steps")]
#[command(version = stepbind_core::VERSION)]
struct Cli {
    /// YAML test configuration (default: nearest config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run feature files and report per-scenario results
    Run {
        /// Feature files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Only run scenarios carrying one of these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Append assertion records to this JSON result log
        #[arg(long)]
        results: Option<PathBuf>,
        /// Write the full run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Report undefined steps without running any handler
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List registered step patterns
    Steps,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let registry = standard_registry(ClusterSteps::from_config(&config)?)?;

    let code = match cli.command {
        Commands::Run {
            paths,
            tags,
            results,
            report,
        } => handle_run(registry, &paths, tags, results, report)?,
        Commands::Check { paths } => handle_check(&registry, &paths)?,
        Commands::Steps => handle_steps(&registry),
    };
    std::process::exit(code)
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<TestConfig> {
    if let Some(path) = explicit {
        return TestConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()));
    }

    let cwd = std::env::current_dir().context("reading the working directory")?;
    match TestConfig::discover(&cwd, TestConfig::DEFAULT_FILE)? {
        Some((path, config)) => {
            info!(path = %path.display(), "configuration discovered");
            Ok(config)
        }
        None => {
            warn!("no {} found, using defaults", TestConfig::DEFAULT_FILE);
            Ok(TestConfig::default())
        }
    }
}

fn read_features(paths: &[PathBuf]) -> anyhow::Result<Vec<Feature>> {
    let features = load_features(paths).context("loading feature files")?;
    if features.is_empty() {
        anyhow::bail!("no .feature files found");
    }
    Ok(features)
}

fn handle_run(
    registry: StepRegistry,
    paths: &[PathBuf],
    tags: Vec<String>,
    results: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<i32> {
    let features = read_features(paths)?;
    println!("🚀 Running {} feature file(s)...", features.len());

    let runner = ScenarioRunner::new(Arc::new(registry)).with_tags(tags);
    let report = runner.run(&features);
    println!("{}", report.render());

    if let Some(path) = results {
        let total = ResultLog::new(&path).append(report.assertions())?;
        println!("📝 {} now holds {total} assertion record(s)", path.display());
    }
    if let Some(path) = report_path {
        report.write_json(&path)?;
        println!("📄 Report written to {}", path.display());
    }

    let code = report.exit_code();
    if code == 0 {
        println!("✅ All scenarios passed");
    } else {
        println!("❌ {} scenario(s) failed", report.summary().scenarios_failed);
    }
    Ok(code)
}

fn handle_check(registry: &StepRegistry, paths: &[PathBuf]) -> anyhow::Result<i32> {
    let features = read_features(paths)?;
    let mut undefined = 0;

    for feature in &features {
        let mut steps: Vec<_> = feature
            .background
            .iter()
            .chain(
                feature
                    .scenarios
                    .iter()
                    .flat_map(|scenario| scenario.background.iter().chain(&scenario.steps)),
            )
            .collect();
        // rule backgrounds and outline rows repeat the same source line
        steps.sort_by_key(|step| step.line);
        steps.dedup_by(|a, b| a.line == b.line && a.text == b.text);

        for step in steps {
            if registry.find(&step.text).is_err() {
                undefined += 1;
                println!("❓ {}:{} {} {}", feature.source, step.line, step.keyword, step.text);
                println!("   suggested pattern: {}", suggest_expression(&step.text));
            }
        }
    }

    if undefined == 0 {
        println!("✅ Every step is defined");
        Ok(0)
    } else {
        println!("❌ {undefined} undefined step(s)");
        Ok(1)
    }
}

fn handle_steps(registry: &StepRegistry) -> i32 {
    println!("📋 Registered steps");
    for definition in registry.definitions() {
        println!(
            "  {:<5} {}",
            definition.keyword().to_string(),
            definition.pattern().source()
        );
    }
    println!("{} step(s)", registry.len());
    0
}
