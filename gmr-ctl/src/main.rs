use std::time::Duration;

use anyhow::Context;

mod args;
use args::{parse_args, Commands};

mod core;
use crate::core::{build_request, format_jobs, format_pool, print_result, CoordinatorClient};

use workload::Descriptor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    let client = CoordinatorClient::new(&args.coordinator)?;

    match args.command {
        Commands::Jobs => println!("{}", format_jobs(&client.jobs().await?)),
        Commands::Workers => println!("{}", format_pool(&client.workers().await?)),
        Commands::Status { job_id } => {
            let status = client.status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Result { job_id } => print_result(&client.result(&job_id).await?)?,
        Commands::Submit {
            input,
            text,
            split_size,
            reducers,
            map,
            map_args,
            reduce,
            reduce_args,
            wait,
            poll_ms,
        } => {
            let data = match (input, text) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("either --input or --text is required"),
            };

            let request = build_request(
                data,
                split_size,
                reducers,
                Descriptor::new(map, map_args),
                Descriptor::new(reduce, reduce_args),
            );
            let submitted = client.submit(&request).await?;
            let job_id = submitted.job_id.to_string();
            println!("{}", job_id);

            if wait {
                let result = client
                    .wait_for_result(&job_id, Duration::from_millis(poll_ms))
                    .await?;
                print_result(&result)?;
            }
        }
    }

    Ok(())
}
