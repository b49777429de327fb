use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use common::protocol::{
    ErrorResponse, JobListResponse, JobResult, JobResultResponse, JobStatusResponse,
    PoolStatusResponse, SubmitJobRequest, SubmitJobResponse, WorkerStatus,
};
use common::JobState;
use workload::Descriptor;

/// HTTP client for the coordinator API.
pub struct CoordinatorClient {
    http: reqwest::Client,
    base: Url,
}

impl CoordinatorClient {
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("invalid coordinator URL `{}`", base))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    pub async fn submit(&self, request: &SubmitJobRequest) -> Result<SubmitJobResponse> {
        let response = self
            .http
            .post(self.url("submit_job")?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            bail!("submission rejected: {}", reason);
        }
        Ok(response.json().await?)
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatusResponse> {
        self.get(&format!("job_status/{}", job_id)).await
    }

    pub async fn result(&self, job_id: &str) -> Result<JobResultResponse> {
        self.get(&format!("job_result/{}", job_id)).await
    }

    pub async fn jobs(&self) -> Result<JobListResponse> {
        self.get("jobs").await
    }

    pub async fn workers(&self) -> Result<PoolStatusResponse> {
        self.get("workers").await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.url(path)?).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    /// Poll until the job is terminal, then fetch its result.
    pub async fn wait_for_result(&self, job_id: &str, poll: Duration) -> Result<JobResultResponse> {
        loop {
            let status = self.status(job_id).await?;
            match status.state {
                JobState::NotFound => bail!("job {} not found", job_id),
                state if state.is_terminal() => return self.result(job_id).await,
                _ => {
                    if let Some(progress) = status.progress {
                        eprintln!("{} {}", status.state, progress);
                    }
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }
}

/// Build a submission from command-line pieces.
pub fn build_request(
    data: String,
    split_size: i64,
    num_reducers: i64,
    map: Descriptor,
    reduce: Descriptor,
) -> SubmitJobRequest {
    SubmitJobRequest {
        data,
        split_size,
        num_reducers,
        map_logic: map.to_logic(),
        reduce_logic: reduce.to_logic(),
    }
}

/// `key<TAB>value` lines, sorted by key.
pub fn format_result(result: &JobResult) -> String {
    result
        .iter()
        .map(|(key, value)| format!("{}\t{}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_workers(title: &str, workers: &[WorkerStatus]) -> Vec<String> {
    let mut lines = vec![format!("[{}]", title)];
    lines.extend(workers.iter().map(|w| match w.tasks_in_progress {
        Some(load) => format!("{}\t{} task(s)", w.addr, load),
        None => format!("{}\tunreachable", w.addr),
    }));
    lines
}

pub fn format_pool(pool: &PoolStatusResponse) -> String {
    let mut lines = format_workers("Map workers", &pool.map_workers);
    lines.extend(format_workers("Reduce workers", &pool.reduce_workers));
    lines.push(format!("{} job(s) in flight", pool.jobs_in_flight));
    lines.join("\n")
}

pub fn format_jobs(list: &JobListResponse) -> String {
    let mut lines = vec!["[Jobs]".to_string()];
    lines.extend(
        list.jobs
            .iter()
            .map(|job| format!("{}\t{}\t{}", job.job_id, job.state, job.progress)),
    );
    lines.join("\n")
}

/// Print a result response, failing for anything but `DONE`.
pub fn print_result(response: &JobResultResponse) -> Result<()> {
    match (&response.state, &response.result) {
        (JobState::Done, Some(result)) => {
            println!("{}", format_result(result));
            Ok(())
        }
        (state, _) => bail!(
            "job {} is {}: {}",
            response.job_id,
            state,
            response.message.as_deref().unwrap_or("no result")
        ),
    }
}
