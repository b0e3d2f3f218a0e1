use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use evalgrade::config::{self, Config};
use evalgrade::dataset::JsonDatasetSource;
use evalgrade::error::OrchestratorError;
use evalgrade::fairness::FairnessAuditor;
use evalgrade::jobs::{
    ChannelNotifier, JobEvent, JobStatus, Orchestrator, OrchestratorSettings, SubmitRequest,
    TokioSpawner,
};
use evalgrade::output;
use evalgrade::scoring::{AnalysisMode, Evaluator};
use evalgrade::store::{FileStore, ResultRecord};
use tokio::sync::broadcast::error::RecvError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_JOB_FAILED: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_NOT_FOUND: i32 = 5;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Tsv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Check the config file and report every problem
    Validate,
    /// Evaluate a dataset file and wait for the job to finish
    Run {
        /// Path to a .json (array) or .jsonl dataset
        dataset: PathBuf,
        /// Job id (1-64 chars of A-Z a-z 0-9 _ -); generated when omitted
        #[arg(long)]
        job_id: Option<String>,
        /// Maximum number of records to evaluate
        #[arg(long)]
        sample: Option<usize>,
        /// hybrid, text or quantitative
        #[arg(long)]
        mode: Option<AnalysisMode>,
        /// Pause between records, e.g. "50ms"
        #[arg(long, value_parser = humantime::parse_duration)]
        throttle: Option<Duration>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Run a fairness audit over the results afterwards
        #[arg(long)]
        audit: bool,
    },
    /// Show a job's state
    Status { job_id: String },
    /// Show a job's results
    Results {
        job_id: String,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Audit a job's results for group score disparities
    Audit {
        job_id: String,
        /// Attribute to audit (repeatable); defaults to the configured list
        #[arg(long = "attr")]
        attributes: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List completed jobs, newest first
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Mark unfinished jobs with no recent progress as failed
    Sweep {
        /// Defaults to jobs.stale_after from the config
        #[arg(long, value_parser = humantime::parse_duration)]
        older_than: Option<Duration>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "evalgrade")]
#[command(about = "Hybrid evaluation scoring and fairness auditing", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/evalgrade/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    // A second init only happens in tests; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn exit_code(err: &OrchestratorError) -> i32 {
    match err {
        OrchestratorError::NotFound(_) | OrchestratorError::Conflict(_) => EXIT_NOT_FOUND,
        OrchestratorError::InvalidJobId(_) | OrchestratorError::Store(_) => EXIT_ERROR,
    }
}

fn fail(err: OrchestratorError) -> i32 {
    eprintln!("Error: {}", err);
    exit_code(&err)
}

fn build_orchestrator(
    config: &Config,
    config_path: &Path,
    dataset_root: &Path,
    notifier: Arc<ChannelNotifier>,
) -> Result<Orchestrator, i32> {
    let evaluator = match Evaluator::new(&config.scoring) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            eprintln!("Config error: {}", e);
            return Err(EXIT_CONFIG);
        }
    };
    let settings = match OrchestratorSettings::from_config(&config.jobs) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return Err(EXIT_CONFIG);
        }
    };

    let store_dir = config::resolve_store_dir(config, config_path);
    tracing::debug!(store = %store_dir.display(), "opening file store");

    Ok(Orchestrator::new(
        evaluator,
        Arc::new(FileStore::new(store_dir)),
        Arc::new(JsonDatasetSource::new(dataset_root)),
        Arc::new(TokioSpawner),
    )
    .with_notifier(notifier)
    .with_auditor(FairnessAuditor::new(config.fairness.clone()))
    .with_settings(settings))
}

fn print_results(results: &[ResultRecord], format: OutputFormat) -> i32 {
    match format {
        OutputFormat::Table => {
            println!("{}", output::format_results_table(results, output::should_use_colors()))
        }
        OutputFormat::Tsv => println!("{}", output::format_results_tsv(results)),
        OutputFormat::Json => match output::format_results_json(results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return EXIT_ERROR;
            }
        },
    }
    EXIT_SUCCESS
}

async fn print_audit(orchestrator: &Orchestrator, job_id: &str, attributes: &[String], json: bool) -> i32 {
    let report = match orchestrator.audit(job_id, attributes).await {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                return EXIT_ERROR;
            }
        }
    } else {
        println!("{}", output::format_fairness_report(&report, output::should_use_colors()));
    }
    EXIT_SUCCESS
}

/// How often `follow_job` re-reads the job in case its events stop.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait until the job is terminal, drawing progress on a terminal.
///
/// Events drive the progress line. The stored status is polled as well, so a
/// lost terminal event or a closed channel cannot leave the wait hanging.
async fn follow_job(
    orchestrator: &Orchestrator,
    rx: &mut tokio::sync::broadcast::Receiver<evalgrade::jobs::Envelope>,
    job_id: &str,
) {
    let interactive = std::io::stderr().is_terminal();
    let mut poll = tokio::time::interval(STATUS_POLL_INTERVAL);
    let mut events_open = true;
    loop {
        tokio::select! {
            received = rx.recv(), if events_open => match received {
                Ok(envelope) if envelope.event.job_id() == job_id => {
                    if let JobEvent::AnalysisProgress {
                        progress,
                        processed,
                        total,
                        ..
                    } = &envelope.event
                    {
                        if interactive {
                            eprint!("\r{:>5.1}% ({}/{})", progress, processed, total);
                        }
                    }
                    if envelope.event.is_terminal() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress receiver lagged");
                }
                Err(RecvError::Closed) => events_open = false,
            },
            _ = poll.tick() => match orchestrator.status(job_id).await {
                Ok(job) if job.status.is_terminal() => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "could not read job status");
                    break;
                }
            },
        }
    }
    if interactive {
        eprintln!();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => match config::get_config_path() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(EXIT_CONFIG);
            }
        },
    };

    if let Commands::Init { force } = cli.command {
        match config::write_default_config(&config_path, force) {
            Ok(()) => {
                println!("Config written to {}", config_path.display());
                std::process::exit(EXIT_SUCCESS);
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        }
    }

    let config = match config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for message in e.messages() {
            eprintln!("  - {}", message);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let code = run_command(cli.command, &config, &config_path).await;
    std::process::exit(code);
}

async fn run_command(command: Commands, config: &Config, config_path: &Path) -> i32 {
    let notifier = Arc::new(ChannelNotifier::new(256));

    match command {
        Commands::Init { .. } => EXIT_SUCCESS,
        Commands::Validate => {
            println!("Configuration OK");
            EXIT_SUCCESS
        }
        Commands::Run {
            dataset,
            job_id,
            sample,
            mode,
            throttle,
            format,
            audit,
        } => {
            let (root, dataset_ref) = match (dataset.parent(), dataset.file_name()) {
                (Some(parent), Some(name)) => (
                    if parent.as_os_str().is_empty() {
                        PathBuf::from(".")
                    } else {
                        parent.to_path_buf()
                    },
                    name.to_string_lossy().into_owned(),
                ),
                _ => {
                    eprintln!("Error: {} is not a dataset file", dataset.display());
                    return EXIT_ERROR;
                }
            };
            let orchestrator = match build_orchestrator(config, config_path, &root, notifier.clone()) {
                Ok(o) => o,
                Err(code) => return code,
            };

            // Subscribe before submitting so no event is missed.
            let mut rx = notifier.subscribe();
            let request = SubmitRequest {
                dataset_ref,
                job_id,
                sample_size: sample,
                mode,
                throttle,
            };
            let job_id = match orchestrator.submit(request).await {
                Ok(id) => id,
                Err(e) => return fail(e),
            };
            eprintln!("Submitted job {}", job_id);
            follow_job(&orchestrator, &mut rx, &job_id).await;

            let job = match orchestrator.status(&job_id).await {
                Ok(j) => j,
                Err(e) => return fail(e),
            };
            if job.status != JobStatus::Completed {
                eprintln!("{}", output::format_job_status(&job, output::should_use_colors()));
                return EXIT_JOB_FAILED;
            }

            let results = match orchestrator.results(&job_id).await {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            let code = print_results(&results, format);
            if code != EXIT_SUCCESS || !audit {
                return code;
            }
            println!();
            print_audit(&orchestrator, &job_id, &[], false).await
        }
        Commands::Status { job_id } => {
            let orchestrator = match build_orchestrator(config, config_path, Path::new("."), notifier) {
                Ok(o) => o,
                Err(code) => return code,
            };
            match orchestrator.status(&job_id).await {
                Ok(job) => {
                    println!("{}", output::format_job_status(&job, output::should_use_colors()));
                    if job.status == JobStatus::Failed {
                        EXIT_JOB_FAILED
                    } else {
                        EXIT_SUCCESS
                    }
                }
                Err(e) => fail(e),
            }
        }
        Commands::Results { job_id, format } => {
            let orchestrator = match build_orchestrator(config, config_path, Path::new("."), notifier) {
                Ok(o) => o,
                Err(code) => return code,
            };
            if let Err(e) = orchestrator.status(&job_id).await {
                return fail(e);
            }
            match orchestrator.results(&job_id).await {
                Ok(results) => print_results(&results, format),
                Err(e) => fail(e),
            }
        }
        Commands::Audit {
            job_id,
            attributes,
            json,
        } => {
            let orchestrator = match build_orchestrator(config, config_path, Path::new("."), notifier) {
                Ok(o) => o,
                Err(code) => return code,
            };
            if let Err(e) = orchestrator.status(&job_id).await {
                return fail(e);
            }
            print_audit(&orchestrator, &job_id, &attributes, json).await
        }
        Commands::Jobs { limit } => {
            let orchestrator = match build_orchestrator(config, config_path, Path::new("."), notifier) {
                Ok(o) => o,
                Err(code) => return code,
            };
            match orchestrator.completed_jobs(limit).await {
                Ok(jobs) => {
                    println!("{}", output::format_job_list(&jobs, output::should_use_colors()));
                    EXIT_SUCCESS
                }
                Err(e) => fail(e),
            }
        }
        Commands::Sweep { older_than } => {
            let older_than = match older_than {
                Some(d) => d,
                None => match config.jobs.stale_after() {
                    Ok(d) => d,
                    Err(e) => {
                        eprintln!("Config error: jobs.stale_after: {}", e);
                        return EXIT_CONFIG;
                    }
                },
            };
            let orchestrator = match build_orchestrator(config, config_path, Path::new("."), notifier) {
                Ok(o) => o,
                Err(code) => return code,
            };
            match orchestrator.reconcile_stale(older_than).await {
                Ok(ids) if ids.is_empty() => {
                    println!("No stale jobs.");
                    EXIT_SUCCESS
                }
                Ok(ids) => {
                    for id in ids {
                        println!("Marked {} as failed", id);
                    }
                    EXIT_SUCCESS
                }
                Err(e) => fail(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalgrade::dataset::MemoryDatasets;
    use evalgrade::jobs::DeferredSpawner;
    use evalgrade::scoring::ScoringConfig;
    use evalgrade::store::MemoryStore;

    #[tokio::test]
    async fn test_follow_job_stops_without_a_terminal_event() {
        let spawner = Arc::new(DeferredSpawner::new());
        let orchestrator = Orchestrator::new(
            Arc::new(Evaluator::new(&ScoringConfig::default()).unwrap()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDatasets::new()),
            spawner.clone(),
        );
        let id = orchestrator.submit(SubmitRequest::new("missing")).await.unwrap();
        spawner.run_pending().await;

        // The job reported to a different notifier; this channel stays open and silent.
        let notifier = ChannelNotifier::new(16);
        let mut rx = notifier.subscribe();
        tokio::time::timeout(Duration::from_secs(5), follow_job(&orchestrator, &mut rx, &id))
            .await
            .expect("follow_job returns once the stored job is terminal");
        assert_eq!(orchestrator.status(&id).await.unwrap().status, JobStatus::Failed);
    }
}
