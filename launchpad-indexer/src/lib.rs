mod accounts;
pub mod block_number_filter;
pub mod bus;
pub mod cache_machine;
mod config;
mod contracts;
pub mod decoding;
mod engine_task;
mod error;
pub mod events;
pub mod families;
mod hashes;
pub mod id_lock;
pub mod ingester;
mod multi_sync_engine;
mod networks;
pub mod processor;
mod repos;
pub mod speed_counter;
mod sync_engine;
pub mod transaction_items;
pub mod workers;

pub use accounts::Account;
pub use block_number_filter::{BlockNumberFilter, FilterResult, FilterStatus};
pub use bus::{BroadcastNotifier, BusEvent, EventNotifier, NotifierError};
pub use cache_machine::CacheMachine;
pub use config::{Config, ConfigError, ContractConfig, NetworkConfig, TickDividers};
pub use contracts::{Contract, ContractType, UnsavedContract};
pub use engine_task::EngineTask;
pub use error::{timed, SyncError};
pub use hashes::Hashes;
pub use id_lock::IdLock;
pub use ingester::{Provider, ProviderError};
pub use multi_sync_engine::MultiSyncEngine;
pub use networks::Network;
pub use processor::EventStorageProcessor;
pub use repos::*;
pub use speed_counter::SpeedCounter;
pub use sync_engine::{SyncEngine, SyncEngineStats};

#[cfg(feature = "postgres")]
pub type LaunchpadRepo = PostgresRepo;

#[cfg(feature = "postgres")]
pub type LaunchpadRepoClient = PostgresRepoClient;

#[cfg(feature = "postgres")]
pub type LaunchpadRepoTxnClient<'a> = PostgresRepoTxnClient<'a>;

pub use ethers::types::{Address, U256};
