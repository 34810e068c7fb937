use std::time::Duration;

use tokio::sync::Mutex;

use super::Worker;
use crate::error::{timed, SyncError};
use crate::networks::Network;
use crate::repos::{Repo, RepoClient, TableRowCounts};

/// Per network: snapshots storage row counts and contract checkpoints.
pub struct DbWorker<R: Repo> {
    network: Network,
    repo: R,
    repo_timeout: Duration,
    stats: Mutex<TableRowCounts>,
}

impl<R: Repo> DbWorker<R> {
    pub fn new(network: Network, repo: R, repo_timeout: Duration) -> Self {
        Self {
            network,
            repo,
            repo_timeout,
            stats: Mutex::new(TableRowCounts::default()),
        }
    }
}

#[async_trait::async_trait]
impl<R: Repo> Worker for DbWorker<R> {
    type Stats = TableRowCounts;

    fn get_name(&self) -> &'static str {
        "db"
    }

    async fn work(&self) -> Result<(), SyncError> {
        let client = timed(self.repo_timeout, "get_client", self.repo.get_client()).await?;
        let counts =
            timed(self.repo_timeout, "count_rows", client.count_rows(self.network.id)).await?;

        *self.stats.lock().await = counts;

        Ok(())
    }

    async fn get_stats(&self) -> TableRowCounts {
        self.stats.lock().await.clone()
    }

    async fn reset(&self) {
        *self.stats.lock().await = TableRowCounts::default();
    }
}
