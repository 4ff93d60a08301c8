//! Process configuration: which queue/store backend to use, where its data
//! lives, and how many workers a pool should run. Populated from CLI flags
//! (see `main.rs`); there is no remote config service.

use std::path::PathBuf;

/// Which interchangeable backend a Task Queue / Result Store pair runs on.
#[derive(Debug, Clone)]
pub enum BackendKind {
    /// Temp-write-then-rename files under `data_dir`.
    Filesystem { data_dir: PathBuf },
    /// A Redis instance reachable at `redis_url`.
    Broker { redis_url: String },
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub backend: BackendKind,
    /// Number of Worker processes a pool maintains.
    pub worker_count: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Filesystem {
                data_dir: PathBuf::from("data"),
            },
            worker_count: num_cpus::get().max(1),
        }
    }
}
