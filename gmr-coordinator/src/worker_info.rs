use std::fmt;

use url::Url;

use crate::error::ConfigError;

/// Position of a worker inside its pool.
pub type WorkerID = usize;

/// Which phase a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkType {
    Map,
    Reduce,
}

impl WorkType {
    /// Path of the task endpoint on a worker of this kind.
    pub fn task_endpoint(self) -> &'static str {
        match self {
            WorkType::Map => "map_task",
            WorkType::Reduce => "reduce_task",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkType::Map => f.write_str("map"),
            WorkType::Reduce => f.write_str("reduce"),
        }
    }
}

/// A configured worker endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Unique within the pool; also the pool order.
    pub id: WorkerID,

    /// Base address, always ending in `/`.
    pub addr: Url,
}

impl WorkerInfo {
    pub fn new(id: WorkerID, mut addr: Url) -> Self {
        if !addr.path().ends_with('/') {
            let path = format!("{}/", addr.path());
            addr.set_path(&path);
        }
        Self { id, addr }
    }

    /// Full URL of `path` on this worker.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.addr.join(path)
    }
}

impl fmt::Display for WorkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.addr.as_str().trim_end_matches('/'))
    }
}

/// An ordered set of workers serving one phase.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    kind: WorkType,
    workers: Vec<WorkerInfo>,
}

impl WorkerPool {
    pub fn new(kind: WorkType, addrs: Vec<Url>) -> Self {
        let workers = addrs
            .into_iter()
            .enumerate()
            .map(|(id, addr)| WorkerInfo::new(id, addr))
            .collect();
        Self { kind, workers }
    }

    /// Build a pool from textual addresses such as `http://localhost:8001`.
    pub fn parse(kind: WorkType, addrs: &[String]) -> Result<Self, ConfigError> {
        let urls = addrs
            .iter()
            .map(|addr| {
                let url = Url::parse(addr.trim()).map_err(|e| ConfigError::InvalidWorkerAddr {
                    addr: addr.clone(),
                    reason: e.to_string(),
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidWorkerAddr {
                        addr: addr.clone(),
                        reason: "scheme must be http or https".to_string(),
                    });
                }
                Ok(url)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if urls.is_empty() {
            return Err(ConfigError::EmptyPool(kind));
        }
        Ok(Self::new(kind, urls))
    }

    pub fn kind(&self) -> WorkType {
        self.kind
    }

    pub fn workers(&self) -> &[WorkerInfo] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ids_follow_configuration_order() {
        let pool = WorkerPool::parse(
            WorkType::Map,
            &addrs(&["http://localhost:8001", "http://localhost:8003"]),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.workers()[1].id, 1);
        assert_eq!(pool.workers()[1].to_string(), "http://localhost:8003");
    }

    #[test]
    fn endpoints_keep_base_path() {
        let worker = WorkerInfo::new(0, Url::parse("http://host:9000/gridmr").unwrap());
        assert_eq!(
            worker.endpoint("map_task").unwrap().as_str(),
            "http://host:9000/gridmr/map_task"
        );
    }

    #[test]
    fn rejects_bad_pools() {
        assert!(matches!(
            WorkerPool::parse(WorkType::Reduce, &[]),
            Err(ConfigError::EmptyPool(WorkType::Reduce))
        ));
        assert!(WorkerPool::parse(WorkType::Map, &addrs(&["not a url"])).is_err());
        assert!(WorkerPool::parse(WorkType::Map, &addrs(&["ftp://host"])).is_err());
    }
}
