use clap::Parser;
use jet_client::{BlockingJetClient, ClientConfig, Job, JobConfig, JobGraph};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "submit-job")]
#[command(about = "Submit a serialized job graph and wait for it to finish")]
struct Args {
    /// Member address
    #[arg(long, default_value = "127.0.0.1:5701")]
    addr: String,

    /// Member id; a random one is used when omitted
    #[arg(long)]
    member_id: Option<Uuid>,

    /// Path to the serialized job graph
    #[arg(short, long)]
    graph: String,

    /// Job name
    #[arg(short, long)]
    name: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = ClientConfig::default()
        .with_member(args.member_id.unwrap_or_else(Uuid::new_v4), args.addr);
    let client = BlockingJetClient::connect(&config)?;

    let graph = JobGraph::from_serialized(std::fs::read(&args.graph)?);
    let mut job_config = JobConfig::new();
    if let Some(name) = args.name {
        job_config = job_config.with_name(name);
    }

    let job = client.new_job(graph, job_config)?;
    println!("Submitted {}", job);
    println!("Submitted at: {}", client.job_submission_time(&job)?);

    client.join_job(&job)?;
    println!("Job {} finished: {}", job.id(), client.job_status(&job)?);

    Ok(())
}
