use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::sync::Arc;

use dotenvy::dotenv;
use launchpad_indexer::{
    Config, LaunchpadRepo, MemoryRepo, MultiSyncEngine, Provider, Repo, RepoClient,
};
use tracing_subscriber::EnvFilter;

use crate::db;
use crate::factory::{RecordingNotifier, ScriptedProvider, NETWORK};

/// Logs show up with `RUST_LOG=launchpad_indexer=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestEngine {
    pub engine: Arc<MultiSyncEngine<MemoryRepo>>,
    pub repo: MemoryRepo,
    pub notifier: Arc<RecordingNotifier>,
}

/// An engine over [`MemoryRepo`] whose networks are served by `providers`.
pub fn new_engine(config: Config, providers: Vec<(&str, Arc<ScriptedProvider>)>) -> TestEngine {
    init_tracing();

    let repo = MemoryRepo::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let providers: HashMap<_, _> = providers
        .into_iter()
        .map(|(network, provider)| (network.to_owned(), provider as Arc<dyn Provider>))
        .collect();

    let engine = MultiSyncEngine::new(config, repo.clone(), notifier.clone(), providers).unwrap();

    TestEngine {
        engine: Arc::new(engine),
        repo,
        notifier,
    }
}

pub fn new_single_network_engine(config: Config, provider: Arc<ScriptedProvider>) -> TestEngine {
    new_engine(config, vec![(NETWORK, provider)])
}

pub fn new_repo() -> LaunchpadRepo {
    LaunchpadRepo::new(db::database_url().as_str())
}

/// Runs `test_fn` against a migrated, emptied Postgres database.
pub async fn run_test<TestFn, Fut>(test_fn: TestFn)
where
    TestFn: FnOnce(LaunchpadRepo) -> Fut,
    Fut: Future<Output = ()>,
{
    init_tracing();

    if should_setup_test_db() {
        db::setup().await;
    }

    let repo = new_repo();
    let client = repo.get_client().await.unwrap();
    client.migrate().await.unwrap();
    client.hard_reset().await.unwrap();

    test_fn(repo).await;
}

fn should_setup_test_db() -> bool {
    dotenv().ok();

    env::var("SETUP_TEST_DB").is_ok()
}

pub async fn find_contract(repo: &MemoryRepo, address: &str) -> launchpad_indexer::Contract {
    repo.snapshot()
        .await
        .contracts
        .into_iter()
        .find(|c| c.address == address)
        .unwrap_or_else(|| panic!("contract {address} is not stored"))
}
