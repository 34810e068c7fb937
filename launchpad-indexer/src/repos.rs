mod memory_repo;
#[cfg(feature = "postgres")]
mod postgres_repo;
mod repo;

pub use memory_repo::{MemoryRepo, MemoryRepoClient, MemoryRepoTxnClient, MemoryStore};
#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresRepo, PostgresRepoClient, PostgresRepoTxnClient};
pub use repo::{
    ContractRowStats, Repo, RepoClient, RepoError, SQLikeMigrations, TableRowCounts,
};
