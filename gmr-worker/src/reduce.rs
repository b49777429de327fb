use anyhow::{Context, Result};
use tracing::info;

use common::protocol::{ReduceTaskRequest, ReduceTaskResponse};
use workload::Descriptor;

/// Run the requested reduce transform over every key of one partition.
pub fn perform_reduce(request: ReduceTaskRequest) -> Result<ReduceTaskResponse> {
    let descriptor = Descriptor::from_logic(&request.reduce_logic)?;
    info!(
        job_id = %request.job_id,
        reduce_id = %request.reduce_id,
        workload = %descriptor.name,
        keys = request.data.len(),
        "Starting reduce task"
    );

    let results = workload::run_reduce(&descriptor, &request.data).with_context(|| {
        format!(
            "reduce `{}` failed on {}",
            descriptor.name, request.reduce_id
        )
    })?;

    Ok(ReduceTaskResponse {
        job_id: request.job_id,
        reduce_id: request.reduce_id,
        results,
    })
}
