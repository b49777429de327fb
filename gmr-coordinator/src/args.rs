use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The host for the server to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port for the server to run on.
    #[arg(short, long, default_value = "8000")]
    pub port: u16,

    /// Map worker base URLs, comma separated.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values = [
            "http://localhost:8001",
            "http://localhost:8003",
            "http://localhost:8005",
            "http://localhost:8007",
        ]
    )]
    pub map_workers: Vec<String>,

    /// Reduce worker base URLs, comma separated.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values = ["http://localhost:8002", "http://localhost:8004"]
    )]
    pub reduce_workers: Vec<String>,

    /// Bound on one worker load probe, in milliseconds.
    #[arg(long, default_value = "500")]
    pub probe_timeout_ms: u64,

    /// Bound on one task delivery attempt, in milliseconds.
    #[arg(long, default_value = "10000")]
    pub dispatch_timeout_ms: u64,

    /// Delivery attempts against one worker before failing over.
    #[arg(long, default_value = "3")]
    pub attempts_per_worker: u32,

    /// First retry pause, doubled after each further failure.
    #[arg(long, default_value = "100")]
    pub backoff_ms: u64,

    #[arg(long, default_value = "5000")]
    pub max_backoff_ms: u64,

    /// Concurrent dispatches per phase of one job.
    #[arg(long, default_value = "16")]
    pub max_in_flight_tasks: usize,
}
