use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.arbeitnow.com/api/job-board-api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DB_PATH_ENV: &str = "JOBETL_DB";

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_pages: usize,
}

/// Where each layer is staged on disk.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    pub bronze: PathBuf,
    pub silver: PathBuf,
}

impl StagingPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            bronze: dir.join("bronze_jobs.json"),
            silver: dir.join("silver_jobs.csv"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    /// Explicit path first, then `JOBETL_DB`, then the platform data dir.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let path = explicit
            .or_else(|| std::env::var(DB_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_path);
        Self { path }
    }

    fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobetl") {
            proj_dirs.data_dir().join("jobetl.db")
        } else {
            PathBuf::from("jobetl.db")
        }
    }
}
