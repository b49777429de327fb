use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The host for the worker to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port to run the worker on.
    #[arg(short, long, default_value = "8001")]
    pub port: u16,
}
