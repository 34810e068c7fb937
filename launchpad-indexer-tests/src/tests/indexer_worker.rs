#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers::types::{Block, TxHash};
    use launchpad_indexer::events::{RawBlock, RawEvent, RawTransaction};
    use launchpad_indexer::{MemoryRepo, Repo, RepoClient};

    use crate::factory::*;
    use crate::test_runner::{find_contract, new_single_network_engine, TestEngine};

    fn add_claim(provider: &ScriptedProvider, block_number: u64, seed: u64) {
        let hash = tx_hash(seed);

        provider.add_log(
            event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(seed), block_number, hash, 0),
            transaction(hash, VESTING_ADDRESS, vesting_claim_input(), block_number),
        );
    }

    /// Stores an already ingested claim and moves the vesting contract's sync
    /// checkpoint past it, leaving it for the processor.
    async fn store_claim_backlog(repo: &MemoryRepo, block_number: u64, sync_block_number: u64) {
        let contract = find_contract(repo, VESTING_ADDRESS).await;
        let client = repo.get_client().await.unwrap();
        let hash = tx_hash(block_number);
        let log = event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(2), block_number, hash, 0);
        let block = Block::<TxHash> {
            timestamp: 1_700_000_000u64.into(),
            ..Default::default()
        };

        client
            .create_raw_blocks(&[RawBlock::new(&block, contract.network_id, block_number)])
            .await
            .unwrap();
        client
            .create_raw_transactions(&[RawTransaction::new(
                &transaction(hash, VESTING_ADDRESS, vesting_claim_input(), block_number),
                contract.network_id,
                block_number,
            )])
            .await
            .unwrap();
        client.create_raw_events(&[RawEvent::new(&log, &contract).unwrap()]).await.unwrap();
        client.update_sync_block_number(contract.id, sync_block_number).await.unwrap();
    }

    #[tokio::test]
    pub async fn decodes_stored_events_while_the_filter_prepares() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let config = config(vec![
            network(NETWORK, vec![vesting_contract(100)]).with_block_number_filter_size(3)
        ]);
        let TestEngine { engine, repo, .. } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();
        store_claim_backlog(&repo, 150, 190).await;

        engine.sync(None).await.unwrap();

        assert!(provider.get_log_requests(VESTING_ADDRESS).is_empty());
        assert_eq!(repo.snapshot().await.transaction_items.len(), 1);
        let contract = find_contract(&repo, VESTING_ADDRESS).await;
        assert_eq!((contract.sync_block_number, contract.process_block_number), (190, 190));
        let stats = engine.get_stats(NETWORK).await.unwrap();
        assert_eq!(stats.indexer.stats.filtered_block_number, None);
        assert_eq!(stats.indexer.error_count, 0);
    }

    #[tokio::test]
    pub async fn decodes_stored_events_when_a_reading_is_rejected() {
        let provider = Arc::new(ScriptedProvider::with_block_numbers(&[200, 5]));
        let config = config(vec![
            network(NETWORK, vec![vesting_contract(100)]).with_block_number_filter_size(1)
        ]);
        let TestEngine { engine, repo, .. } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();
        store_claim_backlog(&repo, 150, 190).await;

        engine.sync(None).await.unwrap();

        let stats = engine.get_stats(NETWORK).await.unwrap();
        assert_eq!(stats.indexer.error_count, 1);
        assert_eq!(stats.indexer.stats.block_number_filter.last_error, Some(5));
        assert!(provider.get_log_requests(VESTING_ADDRESS).is_empty());

        assert_eq!(repo.snapshot().await.transaction_items.len(), 1);
        assert_eq!(find_contract(&repo, VESTING_ADDRESS).await.process_block_number, 190);
    }

    #[tokio::test]
    pub async fn soft_reset_decodes_again_with_the_filter_on() {
        let provider = Arc::new(ScriptedProvider::new(510));
        add_claim(&provider, 320, 1);
        let config = config(vec![
            network(NETWORK, vec![vesting_contract(300)]).with_block_number_filter_size(2)
        ]);
        let TestEngine {
            engine,
            repo,
            notifier,
        } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();
        for _ in 0..2 {
            engine.sync(None).await.unwrap();
        }
        assert_eq!(repo.snapshot().await.transaction_items.len(), 1);
        let contract = find_contract(&repo, VESTING_ADDRESS).await;
        assert_eq!((contract.sync_block_number, contract.process_block_number), (500, 500));

        engine.soft_reset().await.unwrap();

        let store = repo.snapshot().await;
        assert_eq!(store.transaction_items.len(), 1);
        assert_eq!(store.accounts.len(), 1);
        let contract = find_contract(&repo, VESTING_ADDRESS).await;
        assert_eq!((contract.sync_block_number, contract.process_block_number), (500, 500));
        assert_eq!(provider.get_log_requests(VESTING_ADDRESS), vec![(300, 499)]);
        assert_eq!(notifier.get_events().len(), 2);

        let stats = engine.get_stats(NETWORK).await.unwrap();
        assert_eq!(stats.indexer.stats.filtered_block_number, Some(510));
    }
}
