mod db_worker;
mod indexer_worker;
mod monitoring_worker;
mod worker;

pub use db_worker::DbWorker;
pub use indexer_worker::{IndexerOptions, IndexerStats, IndexerWorker};
pub use monitoring_worker::{MonitoringStats, MonitoringWorker};
pub use worker::{Worker, WorkerRunner, WorkerStats};
