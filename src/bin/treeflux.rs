//! Treeflux CLI - Command-line interface for Treetest Flux
//!
//! Commands:
//! - results: Analyse a study snapshot into a results report
//! - export: Flatten a study snapshot into per-response rows (CSV or JSON)
//! - validate: Report data-quality issues in a study snapshot
//! - order: Print a counterbalanced task order for one participant

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use treetest_flux::tree::TreeIndex;
use treetest_flux::{
    inspect_snapshot, parse_snapshot, presentation_order, DataQualityIssue, ResultsExporter,
    ResultsProcessor, StudySnapshot, Task, FLUX_VERSION, PRODUCER_NAME,
};

/// Treeflux - Results analytics for tree-testing usability studies
#[derive(Parser)]
#[command(name = "treeflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Score tree-testing study responses", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a study snapshot into a results report
    Results {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: ReportFormat,

        /// Leave the flat export rows out of the report
        #[arg(long)]
        no_csv_rows: bool,
    },

    /// Flatten a study snapshot into one row per response
    Export {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },

    /// Report data-quality issues in a study snapshot
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a counterbalanced task order
    Order {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Seed for a reproducible order
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ExportFormat {
    /// Comma-separated values with a header line
    Csv,
    /// JSON array of rows
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TreefluxCliError> {
    match cli.command {
        Commands::Results {
            input,
            output,
            format,
            no_csv_rows,
        } => cmd_results(&input, &output, format, !no_csv_rows),
        Commands::Export {
            input,
            output,
            format,
        } => cmd_export(&input, &output, format),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Order { input, seed } => cmd_order(&input, seed),
    }
}

fn cmd_results(
    input: &Path,
    output: &Path,
    format: ReportFormat,
    include_csv_rows: bool,
) -> Result<(), TreefluxCliError> {
    let snapshot = read_snapshot(input)?;
    let processor = ResultsProcessor::new().include_csv_rows(include_csv_rows);
    let report = processor.analyze(&snapshot);

    let output_data = match format {
        ReportFormat::Json => serde_json::to_string(&report)? + "\n",
        ReportFormat::JsonPretty => serde_json::to_string_pretty(&report)? + "\n",
    };

    write_output(output, &output_data)
}

fn cmd_export(input: &Path, output: &Path, format: ExportFormat) -> Result<(), TreefluxCliError> {
    let snapshot = read_snapshot(input)?;
    let rows = ResultsExporter::rows(&snapshot);
    debug!(rows = rows.len(), "exporting responses");

    let output_data = match format {
        ExportFormat::Csv => ResultsExporter::to_csv(&rows),
        ExportFormat::Json => serde_json::to_string_pretty(&rows)? + "\n",
    };

    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), TreefluxCliError> {
    let snapshot = read_snapshot(input)?;
    let index = TreeIndex::build(&snapshot.tree);
    let issues = inspect_snapshot(&snapshot, &index);

    let report = ValidationReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        node_count: index.stats().node_count,
        task_count: snapshot.tasks.len(),
        response_count: snapshot.responses.len(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Tree nodes: {}", report.node_count);
        println!("Tasks:      {}", report.task_count);
        println!("Responses:  {}", report.response_count);
        println!("Issues:     {}", report.issues.len());

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!("  - {}", describe_issue(issue));
            }
        }
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        Err(TreefluxCliError::ValidationFailed(report.issues.len()))
    }
}

fn cmd_order(input: &Path, seed: Option<u64>) -> Result<(), TreefluxCliError> {
    let snapshot = read_snapshot(input)?;
    if snapshot.tasks.is_empty() {
        return Err(TreefluxCliError::NoTasks);
    }

    let ordered: Vec<Task> = match seed {
        Some(seed) => presentation_order(&snapshot.tasks, &mut StdRng::seed_from_u64(seed)),
        None => presentation_order(&snapshot.tasks, &mut rand::thread_rng()),
    };

    for (position, task) in ordered.iter().enumerate() {
        println!("{}. [{}] {}", position + 1, task.id, task.prompt);
    }

    Ok(())
}

// Helper functions

fn read_snapshot(input: &Path) -> Result<StudySnapshot, TreefluxCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(TreefluxCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    Ok(parse_snapshot(&input_data)?)
}

fn write_output(output: &Path, data: &str) -> Result<(), TreefluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn describe_issue(issue: &DataQualityIssue) -> String {
    match issue {
        DataQualityIssue::DuplicateNodeIds { node_ids } => {
            format!("duplicate node ids in tree: {}", node_ids.join(", "))
        }
        DataQualityIssue::EmptyExpectedNodes { task_id } => {
            format!("task {} has no expected nodes", task_id)
        }
        DataQualityIssue::UnresolvedExpectedNode { task_id, node_id } => {
            format!("task {} expects node {} which is not in the tree", task_id, node_id)
        }
        DataQualityIssue::OrphanResponse {
            response_index,
            task_id,
        } => format!("response {} refers to unknown task {}", response_index, task_id),
        DataQualityIssue::UnknownParticipant {
            response_index,
            participant_id,
        } => format!(
            "response {} refers to unknown participant {}",
            response_index, participant_id
        ),
        DataQualityIssue::OutOfOrderClicks { response_index } => {
            format!("response {} has click timestamps going backwards", response_index)
        }
    }
}

// Error types

#[derive(Debug)]
enum TreefluxCliError {
    Io(io::Error),
    Parse(treetest_flux::ComputeError),
    Json(serde_json::Error),
    NoInput,
    NoTasks,
    ValidationFailed(usize),
}

impl From<io::Error> for TreefluxCliError {
    fn from(e: io::Error) -> Self {
        TreefluxCliError::Io(e)
    }
}

impl From<treetest_flux::ComputeError> for TreefluxCliError {
    fn from(e: treetest_flux::ComputeError) -> Self {
        TreefluxCliError::Parse(e)
    }
}

impl From<serde_json::Error> for TreefluxCliError {
    fn from(e: serde_json::Error) -> Self {
        TreefluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TreefluxCliError> for CliError {
    fn from(e: TreefluxCliError) -> Self {
        match e {
            TreefluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TreefluxCliError::Parse(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a study snapshot with tree, tasks, participants and responses".to_string()),
            },
            TreefluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TreefluxCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input piped on stdin".to_string(),
                hint: Some("Pass --input <file> or pipe a snapshot into stdin".to_string()),
            },
            TreefluxCliError::NoTasks => CliError {
                code: "NO_TASKS".to_string(),
                message: "Study snapshot contains no tasks".to_string(),
                hint: Some("Add tasks to the snapshot before ordering them".to_string()),
            },
            TreefluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} data-quality issues found", count),
                hint: Some("Fix the snapshot or accept degraded scores".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    producer: String,
    version: String,
    node_count: usize,
    task_count: usize,
    response_count: usize,
    issues: Vec<DataQualityIssue>,
}
