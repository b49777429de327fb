use anyhow::{Context, Result};
use tracing::info;

use common::protocol::{MapTaskRequest, MapTaskResponse};
use workload::Descriptor;

/// Run the requested map transform over one split.
pub fn perform_map(request: MapTaskRequest) -> Result<MapTaskResponse> {
    let descriptor = Descriptor::from_logic(&request.map_logic)?;
    info!(
        job_id = %request.job_id,
        split_id = %request.split_id,
        workload = %descriptor.name,
        "Starting map task"
    );

    let results = workload::run_map(&descriptor, &request.data)
        .with_context(|| format!("map `{}` failed on {}", descriptor.name, request.split_id))?;

    Ok(MapTaskResponse {
        job_id: request.job_id,
        split_id: request.split_id,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::LogicDescriptor;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn groups_values_by_key() {
        let job_id = Uuid::new_v4();
        let response = perform_map(MapTaskRequest {
            job_id,
            split_id: "split_0".to_string(),
            data: "a b a".to_string(),
            map_logic: LogicDescriptor(json!({"name": "wc"})),
        })
        .unwrap();

        assert_eq!(response.job_id, job_id);
        assert_eq!(response.split_id, "split_0");
        assert_eq!(response.results["a"], vec![json!(1), json!(1)]);
        assert_eq!(response.results["b"], vec![json!(1)]);
    }

    #[test]
    fn unknown_workload_is_an_error() {
        let result = perform_map(MapTaskRequest {
            job_id: Uuid::new_v4(),
            split_id: "split_0".to_string(),
            data: "a".to_string(),
            map_logic: LogicDescriptor(json!({"name": "rm -rf"})),
        });
        assert!(result.is_err());
    }
}
