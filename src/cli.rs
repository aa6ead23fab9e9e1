//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvSnapshotAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::{JsonReportAdapter, STDOUT};
use crate::adapters::keyword_cluster_adapter::KeywordClusterAdapter;
use crate::adapters::map_cluster_adapter::MapClusterAdapter;
use crate::domain::analysis::{AnalysisResult, analyze_funds};
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::{universe_funds, validate_engine_config};
use crate::domain::error::EngineError;
use crate::domain::quarter::Quarter;
use crate::domain::snapshot::Snapshot;
use crate::domain::universe::{compare_universe, parse_fund_ids};
use crate::ports::cluster_port::ClusterLookup;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::snapshot_port::SnapshotPort;

#[derive(Parser, Debug)]
#[command(name = "fundlens", about = "Quarterly 13F holdings analysis engine")]
pub struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one or more funds' quarterly snapshots
    Analyze {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of <FUND>.csv snapshot files
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Comma-separated fund ids (default: [universe] funds, then every file)
        #[arg(short, long)]
        funds: Option<String>,
        /// identifier,label CSV (default: issuer keyword taxonomy)
        #[arg(long)]
        clusters: Option<PathBuf>,
        /// Output directory (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare funds' moves in a single quarter
    Universe {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        funds: Option<String>,
        /// Target quarter, YYYYQn (default: latest quarter across funds)
        #[arg(short, long)]
        quarter: Option<String>,
        #[arg(long)]
        clusters: Option<PathBuf>,
        /// Output directory for per-fund and universe results (default: universe to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate an engine configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List funds with snapshot files
    ListFunds {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Analyze {
            config,
            data,
            funds,
            clusters,
            output,
        } => run_analyze(
            config.as_deref(),
            data.as_deref(),
            funds.as_deref(),
            clusters.as_deref(),
            output.as_deref(),
        ),
        Command::Universe {
            config,
            data,
            funds,
            quarter,
            clusters,
            output,
        } => run_universe(
            config.as_deref(),
            data.as_deref(),
            funds.as_deref(),
            quarter.as_deref(),
            clusters.as_deref(),
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListFunds { config, data } => run_list_funds(config.as_deref(), data.as_deref()),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EngineError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn load_optional_config(path: Option<&Path>) -> Result<Option<FileConfigAdapter>, EngineError> {
    path.map(load_config).transpose()
}

/// Engine thresholds from the config file, or defaults without one.
pub fn build_engine_config(config: Option<&dyn ConfigPort>) -> Result<EngineConfig, EngineError> {
    match config {
        Some(c) => validate_engine_config(c),
        None => Ok(EngineConfig::default()),
    }
}

/// `--data`, then `[snapshots] dir`.
pub fn resolve_data_dir(
    data_override: Option<&Path>,
    config: Option<&dyn ConfigPort>,
) -> Result<PathBuf, EngineError> {
    if let Some(dir) = data_override {
        return Ok(dir.to_path_buf());
    }
    config
        .and_then(|c| c.get_string("snapshots", "dir"))
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "snapshots".to_string(),
            key: "dir".to_string(),
        })
}

/// `--funds`, then `[universe] funds`, then every fund the source knows.
pub fn resolve_funds(
    funds_override: Option<&str>,
    config: Option<&dyn ConfigPort>,
    source: &dyn SnapshotPort,
) -> Result<Vec<String>, EngineError> {
    if let Some(raw) = funds_override {
        return Ok(parse_fund_ids(raw)?);
    }
    if let Some(c) = config {
        let funds = universe_funds(c)?;
        if !funds.is_empty() {
            return Ok(funds);
        }
    }
    source.list_funds()
}

/// `--clusters`, then `[clusters] map`, then the built-in keyword taxonomy.
pub fn build_cluster_lookup(
    clusters_override: Option<&Path>,
    config: Option<&dyn ConfigPort>,
) -> Result<Box<dyn ClusterLookup>, EngineError> {
    let map_path = clusters_override.map(Path::to_path_buf).or_else(|| {
        config
            .and_then(|c| c.get_string("clusters", "map"))
            .filter(|m| !m.trim().is_empty())
            .map(PathBuf::from)
    });
    match map_path {
        Some(path) => {
            let lookup = MapClusterAdapter::from_file(&path)?;
            info!(path = %path.display(), labels = lookup.len(), "loaded cluster map");
            Ok(Box::new(lookup))
        }
        None => Ok(Box::new(KeywordClusterAdapter::default())),
    }
}

fn report_adapter(config: Option<&dyn ConfigPort>) -> JsonReportAdapter {
    JsonReportAdapter::new(config.is_none_or(|c| c.get_bool("output", "pretty", true)))
}

pub struct PipelineOutcome {
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<(String, EngineError)>,
}

impl PipelineOutcome {
    /// The first failure's exit status, or 0.
    pub fn exit_status(&self) -> u8 {
        self.failures.first().map_or(0, |(_, e)| e.exit_status())
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Loads every fund, then analyzes them in parallel. A fund that fails to
/// load or analyze is reported and skipped; the rest still complete.
pub fn run_analysis_pipeline(
    source: &dyn SnapshotPort,
    funds: &[String],
    config: &EngineConfig,
    lookup: &dyn ClusterLookup,
) -> PipelineOutcome {
    let mut failures = Vec::new();
    let mut loaded_funds: Vec<&String> = Vec::new();
    let mut series: Vec<Vec<Snapshot>> = Vec::new();

    for fund in funds {
        match source.load_snapshots(fund) {
            Ok(snapshots) if snapshots.is_empty() => {
                warn!(fund = %fund, "no snapshots");
                failures.push((
                    fund.clone(),
                    EngineError::EmptySeries {
                        fund_id: fund.clone(),
                    },
                ));
            }
            Ok(snapshots) => {
                loaded_funds.push(fund);
                series.push(snapshots);
            }
            Err(e) => {
                error!(fund = %fund, "{e}");
                failures.push((fund.clone(), e));
            }
        }
    }

    info!(funds = series.len(), "analyzing");
    let mut results = Vec::new();
    for (fund, outcome) in loaded_funds
        .into_iter()
        .zip(analyze_funds(&series, config, lookup))
    {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                error!(fund = %fund, "{e}");
                failures.push((fund.clone(), e));
            }
        }
    }

    PipelineOutcome { results, failures }
}

/// Latest quarter any fund reports.
pub fn latest_quarter(results: &[AnalysisResult]) -> Option<Quarter> {
    results.iter().map(|r| r.quarter_range.1).max()
}

struct RunContext {
    config: Option<FileConfigAdapter>,
    engine: EngineConfig,
    source: CsvSnapshotAdapter,
    lookup: Box<dyn ClusterLookup>,
}

impl RunContext {
    fn load(
        config_path: Option<&Path>,
        data: Option<&Path>,
        clusters: Option<&Path>,
    ) -> Result<Self, EngineError> {
        let config = load_optional_config(config_path)?;
        let port = config.as_ref().map(|c| c as &dyn ConfigPort);
        let engine = build_engine_config(port)?;
        let source = CsvSnapshotAdapter::new(resolve_data_dir(data, port)?);
        let lookup = build_cluster_lookup(clusters, port)?;
        Ok(Self {
            config,
            engine,
            source,
            lookup,
        })
    }

    fn port(&self) -> Option<&dyn ConfigPort> {
        self.config.as_ref().map(|c| c as &dyn ConfigPort)
    }

    fn analyze(&self, funds: Option<&str>) -> Result<PipelineOutcome, EngineError> {
        let funds = resolve_funds(funds, self.port(), &self.source)?;
        if funds.is_empty() {
            return Err(EngineError::SnapshotSource {
                reason: "no funds to analyze".to_string(),
            });
        }
        Ok(run_analysis_pipeline(
            &self.source,
            &funds,
            &self.engine,
            self.lookup.as_ref(),
        ))
    }
}

fn run_analyze(
    config_path: Option<&Path>,
    data: Option<&Path>,
    funds: Option<&str>,
    clusters: Option<&Path>,
    output: Option<&Path>,
) -> Result<ExitCode, EngineError> {
    let ctx = RunContext::load(config_path, data, clusters)?;
    let outcome = ctx.analyze(funds)?;
    let report = report_adapter(ctx.port());

    for result in &outcome.results {
        let path = match output {
            Some(dir) => dir
                .join(format!("{}.json", result.fund_id))
                .to_string_lossy()
                .into_owned(),
            None => STDOUT.to_string(),
        };
        report.write_analysis(result, &path)?;
    }

    eprintln!(
        "{} funds analyzed, {} failed",
        outcome.results.len(),
        outcome.failures.len()
    );
    Ok(outcome.exit_code())
}

fn run_universe(
    config_path: Option<&Path>,
    data: Option<&Path>,
    funds: Option<&str>,
    quarter: Option<&str>,
    clusters: Option<&Path>,
    output: Option<&Path>,
) -> Result<ExitCode, EngineError> {
    let ctx = RunContext::load(config_path, data, clusters)?;
    let quarter = quarter.map(str::parse::<Quarter>).transpose()?;
    let outcome = ctx.analyze(funds)?;

    let Some(quarter) = quarter.or_else(|| latest_quarter(&outcome.results)) else {
        return Err(EngineError::SnapshotSource {
            reason: "no fund could be analyzed".to_string(),
        });
    };
    if outcome.results.len() < 2 {
        warn!(funds = outcome.results.len(), "universe comparison needs at least two funds");
    }

    let universe = compare_universe(&outcome.results, quarter, &ctx.engine)?;

    let report = report_adapter(ctx.port());
    match output {
        Some(dir) => report.write_all(&outcome.results, &universe, &dir.to_string_lossy(), "json")?,
        None => report.write_universe(&universe, STDOUT)?,
    }

    eprintln!(
        "{quarter}: {} funds, {} overlapping, {} divergent, {} shared moves",
        universe.funds.len(),
        universe.overlap.len(),
        universe.divergence.len(),
        universe.shared_moves.len()
    );
    Ok(outcome.exit_code())
}

fn run_validate(config_path: &Path) -> Result<ExitCode, EngineError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    let engine = validate_engine_config(&config)?;
    let funds = universe_funds(&config)?;

    let rendered = serde_json::to_string_pretty(&engine).map_err(|e| EngineError::Report {
        reason: e.to_string(),
    })?;
    println!("{rendered}");
    if !funds.is_empty() {
        eprintln!("Universe: {}", funds.join(", "));
    }
    eprintln!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}

fn run_list_funds(config_path: Option<&Path>, data: Option<&Path>) -> Result<ExitCode, EngineError> {
    let config = load_optional_config(config_path)?;
    let port = config.as_ref().map(|c| c as &dyn ConfigPort);
    let source = CsvSnapshotAdapter::new(resolve_data_dir(data, port)?);

    let funds = source.list_funds()?;
    if funds.is_empty() {
        eprintln!("No funds found");
    } else {
        for fund in &funds {
            println!("{}", fund);
        }
        eprintln!("{} funds found", funds.len());
    }
    Ok(ExitCode::SUCCESS)
}
