use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use jet_client::config::{ClientConfig, MemberConfig};
use jet_client::metrics::{self, JournalCursor, MetricsEntry, ReadOutcome};
use jet_client::shutdown::install_stop_handler;
use jet_client::{Job, JetClient, JobConfig, JobGraph, JobId, Member, MemberId};

#[derive(Parser, Debug)]
#[command(name = "jet-client")]
#[command(version)]
#[command(about = "Client for a cluster-hosted job execution service")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Job management commands
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Distributed object commands
    Object {
        #[command(subcommand)]
        command: ObjectCommands,
    },

    /// Metrics journal commands
    Metrics {
        #[command(subcommand)]
        command: MetricsCommands,
    },
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(clap::Args, Debug)]
struct ClientArgs {
    /// Cluster members (comma-separated, format: "uuid@host:port").
    /// The first member is treated as the coordinator.
    #[arg(long, short = 'm', global = true, default_value = "")]
    members: String,

    /// Cluster name
    #[arg(long, global = true, default_value = "jet")]
    cluster_name: String,

    /// Connect timeout in milliseconds
    #[arg(long, global = true, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit a serialized job graph
    Submit {
        /// Path to the serialized job graph
        #[arg(long)]
        graph: PathBuf,

        /// Job name
        #[arg(long)]
        name: Option<String>,
    },
    /// List job ids, optionally only those with the given name
    List {
        #[arg(long)]
        name: Option<String>,
    },
    /// List jobs with their summaries
    Summaries,
    /// Get status of a specific job
    Status {
        /// The job ID (dashed hex or decimal)
        job_id: String,
    },
    /// Cancel a job
    Cancel {
        /// The job ID (dashed hex or decimal)
        job_id: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ObjectCommands {
    /// Check whether a distributed object exists
    Exists { service: String, object: String },
}

#[derive(clap::Subcommand, Debug)]
enum MetricsCommands {
    /// Read one slice of a member's metrics journal
    Read {
        /// Member UUID
        #[arg(long)]
        member: Uuid,

        /// Start sequence
        #[arg(long, default_value = "0")]
        from: u64,
    },
    /// Follow a member's metrics journal until interrupted
    Tail {
        /// Member UUID
        #[arg(long)]
        member: Uuid,

        /// Start sequence
        #[arg(long, default_value = "0")]
        from: u64,

        /// Pause between reads when the journal is drained
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobSubmitOutput {
    job_id: String,
    name: Option<String>,
}

#[derive(Serialize)]
struct JobListOutput {
    job_ids: Vec<String>,
}

#[derive(Serialize)]
struct JobStatusOutput {
    job_id: String,
    status: String,
}

#[derive(Serialize)]
struct JobSummaryOutput {
    job_id: String,
    name: Option<String>,
    status: String,
    submission_time: String,
    completion_time: Option<String>,
    failure_reason: Option<String>,
}

#[derive(Serialize)]
struct ObjectExistsOutput {
    service: String,
    object: String,
    exists: bool,
}

#[derive(Serialize)]
struct MetricsEntryOutput {
    sequence: u64,
    record_hex: String,
}

#[derive(Serialize)]
struct MetricsReadOutput {
    outcome: &'static str,
    requested: u64,
    next_sequence: u64,
    oldest_available: Option<u64>,
    entries: Vec<MetricsEntryOutput>,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_members(members_str: &str) -> Vec<MemberConfig> {
    if members_str.is_empty() {
        return Vec::new();
    }

    members_str
        .split(',')
        .filter_map(|member| {
            let member = member.trim();
            let Some((id, addr)) = member.split_once('@') else {
                tracing::warn!(member, "Invalid member format, expected uuid@host:port");
                return None;
            };
            match Uuid::parse_str(id) {
                Ok(id) => Some(MemberConfig {
                    id,
                    addr: addr.to_string(),
                }),
                Err(_) => {
                    tracing::warn!(member, "Invalid member UUID");
                    None
                }
            }
        })
        .collect()
}

fn client_config(args: &ClientArgs) -> ClientConfig {
    ClientConfig {
        cluster_name: args.cluster_name.clone(),
        members: parse_members(&args.members),
        connect_timeout_ms: args.connect_timeout_ms,
        ..ClientConfig::default()
    }
}

fn find_member(client: &JetClient, id: Uuid) -> Result<Member, Box<dyn std::error::Error>> {
    client
        .members()
        .get(&MemberId(id))
        .cloned()
        .ok_or_else(|| format!("Member {} is not part of the configured cluster", id).into())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn entry_outputs(entries: &[MetricsEntry]) -> Vec<MetricsEntryOutput> {
    entries
        .iter()
        .map(|e| MetricsEntryOutput {
            sequence: e.sequence,
            record_hex: hex(&e.record),
        })
        .collect()
}

fn read_output(requested: u64, outcome: &ReadOutcome) -> MetricsReadOutput {
    match outcome {
        ReadOutcome::Drained { next_sequence } => MetricsReadOutput {
            outcome: "drained",
            requested,
            next_sequence: *next_sequence,
            oldest_available: None,
            entries: Vec::new(),
        },
        ReadOutcome::Progress(slice) => MetricsReadOutput {
            outcome: "progress",
            requested,
            next_sequence: slice.next_sequence,
            oldest_available: None,
            entries: entry_outputs(&slice.entries),
        },
        ReadOutcome::Gap {
            requested,
            oldest_available,
            slice,
        } => MetricsReadOutput {
            outcome: "gap",
            requested: *requested,
            next_sequence: slice.next_sequence,
            oldest_available: Some(*oldest_available),
            entries: entry_outputs(&slice.entries),
        },
    }
}

fn print_read(output: &MetricsReadOutput, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(output)?),
        OutputFormat::Table => {
            if let Some(oldest) = output.oldest_available {
                println!(
                    "GAP: entries {}..{} were evicted before they were read",
                    output.requested, oldest
                );
            }
            for entry in &output.entries {
                println!("{:<12} {}", entry.sequence, entry.record_hex);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_job(
    client: &JetClient,
    command: JobCommands,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        JobCommands::Submit { graph, name } => {
            let serialized = tokio::fs::read(&graph).await?;
            let mut config = JobConfig::new();
            if let Some(name) = name {
                config = config.with_name(name);
            }
            let job = client
                .new_job(JobGraph::from_serialized(serialized), config)
                .await?;
            match output_format {
                OutputFormat::Json => {
                    let output = JobSubmitOutput {
                        job_id: job.id().to_string(),
                        name: job.name().map(str::to_string),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Table => {
                    println!("Job submitted successfully!");
                    println!("Job ID: {}", job.id());
                }
            }
        }
        JobCommands::List { name } => {
            let jobs = match name {
                Some(name) => client.jobs_by_name(&name).await?,
                None => client.jobs().await?,
            };
            let job_ids: Vec<String> = jobs.iter().map(|j| j.id().to_string()).collect();
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&JobListOutput { job_ids })?);
                }
                OutputFormat::Table => {
                    if job_ids.is_empty() {
                        println!("No jobs found.");
                    } else {
                        println!("JOB ID");
                        println!("{}", "-".repeat(19));
                        for id in &job_ids {
                            println!("{}", id);
                        }
                    }
                }
            }
        }
        JobCommands::Summaries => {
            let summaries = client.job_summaries().await?;
            let rows: Vec<JobSummaryOutput> = summaries
                .into_iter()
                .map(|s| JobSummaryOutput {
                    job_id: s.job_id.to_string(),
                    name: s.name,
                    status: s.status.to_string(),
                    submission_time: s.submission_time.to_rfc3339(),
                    completion_time: s.completion_time.map(|t| t.to_rfc3339()),
                    failure_reason: s.failure_reason,
                })
                .collect();
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Table => {
                    if rows.is_empty() {
                        println!("No jobs found.");
                    } else {
                        println!(
                            "{:<21} {:<12} {:<27} NAME",
                            "JOB ID", "STATUS", "SUBMITTED"
                        );
                        println!("{}", "-".repeat(78));
                        for row in &rows {
                            println!(
                                "{:<21} {:<12} {:<27} {}",
                                row.job_id,
                                row.status,
                                row.submission_time,
                                row.name.as_deref().unwrap_or("-")
                            );
                            if let Some(reason) = &row.failure_reason {
                                println!("  failure: {}", reason);
                            }
                        }
                    }
                }
            }
        }
        JobCommands::Status { job_id } => {
            let id: JobId = job_id.parse()?;
            let Some(job) = client.job(id).await? else {
                eprintln!("Error: Job {} not found", id);
                std::process::exit(1);
            };
            let status = job.status().await?;
            match output_format {
                OutputFormat::Json => {
                    let output = JobStatusOutput {
                        job_id: id.to_string(),
                        status: status.to_string(),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Table => {
                    println!("Job ID: {}", id);
                    println!("Status: {}", status);
                }
            }
        }
        JobCommands::Cancel { job_id } => {
            let id: JobId = job_id.parse()?;
            let Some(job) = client.job(id).await? else {
                eprintln!("Error: Job {} not found", id);
                std::process::exit(1);
            };
            job.cancel().await?;
            println!("Cancellation requested for job {}", id);
        }
    }
    Ok(())
}

async fn handle_object(
    client: &JetClient,
    command: ObjectCommands,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ObjectCommands::Exists { service, object } => {
            let exists = client.exists_distributed_object(&service, &object).await?;
            match output_format {
                OutputFormat::Json => {
                    let output = ObjectExistsOutput {
                        service,
                        object,
                        exists,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Table => {
                    let verdict = if exists { "exists" } else { "does not exist" };
                    println!("{}/{} {}", service, object, verdict);
                }
            }
        }
    }
    Ok(())
}

async fn handle_metrics(
    client: &JetClient,
    command: MetricsCommands,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        MetricsCommands::Read { member, from } => {
            let member = find_member(client, member)?;
            let outcome = client.read_metrics(&member, from).await?;
            print_read(&read_output(from, &outcome), output_format)?;
        }
        MetricsCommands::Tail {
            member,
            from,
            interval_ms,
        } => {
            let member = find_member(client, member)?;
            let cancel = install_stop_handler()?;
            let mut position = from;
            let mut stream = metrics::tail(
                client.metrics_reader(),
                JournalCursor::new(member, from),
                Duration::from_millis(interval_ms),
                cancel,
            );

            while let Some(result) = stream.next().await {
                let outcome = result?;
                let output = read_output(position, &outcome);
                position = match &outcome {
                    ReadOutcome::Gap {
                        oldest_available,
                        slice,
                        ..
                    } if slice.is_empty() => *oldest_available,
                    _ => output.next_sequence,
                };
                if !output.entries.is_empty() || output.oldest_available.is_some() {
                    print_read(&output, output_format)?;
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = client_config(&args.client);
    if config.members.is_empty() {
        return Err("No members configured, use --members uuid@host:port".into());
    }

    let client = JetClient::connect(&config).await?;

    match args.command {
        Commands::Job { command } => handle_job(&client, command, &args.client.output).await?,
        Commands::Object { command } => {
            handle_object(&client, command, &args.client.output).await?
        }
        Commands::Metrics { command } => {
            handle_metrics(&client, command, &args.client.output).await?
        }
    }

    Ok(())
}
