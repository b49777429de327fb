use std::path::PathBuf;

use clap::{Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base URL of the coordinator.
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub coordinator: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// List all jobs which have been submitted and their states.
    Jobs,
    /// Show every configured worker and its current load.
    Workers,
    /// Show the state and progress of one job.
    Status { job_id: String },
    /// Fetch the result of one job.
    Result { job_id: String },
    /// Submit a job to the coordinator.
    Submit {
        /// File to read the input text from.
        #[arg(short, long, required_unless_present = "text", conflicts_with = "text")]
        input: Option<PathBuf>,

        /// Input text given inline.
        #[arg(short, long)]
        text: Option<String>,

        /// Tokens per map split.
        #[arg(short, long, default_value = "100")]
        split_size: i64,

        /// Number of reduce partitions.
        #[arg(short, long, default_value = "1")]
        reducers: i64,

        /// Name of the map transform.
        #[arg(long, default_value = "wc")]
        map: String,

        /// Argument for the map transform. May be repeated.
        #[arg(long = "map-arg", allow_hyphen_values = true)]
        map_args: Vec<String>,

        /// Name of the reduce transform.
        #[arg(long, default_value = "sum")]
        reduce: String,

        /// Argument for the reduce transform. May be repeated.
        #[arg(long = "reduce-arg", allow_hyphen_values = true)]
        reduce_args: Vec<String>,

        /// Wait for the job to finish and print its result.
        #[arg(short, long)]
        wait: bool,

        /// Polling interval while waiting, in milliseconds.
        #[arg(long, default_value = "500")]
        poll_ms: u64,
    },
}

/// Parse the user command.
pub fn parse_args() -> Args {
    Args::parse()
}
