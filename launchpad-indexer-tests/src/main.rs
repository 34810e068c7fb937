use launchpad_indexer::{Repo, RepoClient};
use launchpad_indexer_tests::{db, test_runner};

#[tokio::main]
async fn main() {
    db::setup().await;

    let client = test_runner::new_repo().get_client().await.unwrap();
    client.migrate().await.unwrap();
}
