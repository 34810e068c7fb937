#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use launchpad_indexer::transaction_items::TransactionItem;
    use launchpad_indexer::{
        ConfigError, Contract, MemoryRepo, MultiSyncEngine, Provider, SyncError,
    };

    use crate::factory::*;
    use crate::test_runner::{find_contract, new_engine, new_single_network_engine, TestEngine};

    async fn find_network_contract(repo: &MemoryRepo, network: &str, address: &str) -> Contract {
        let store = repo.snapshot().await;
        let network_id = store.networks.iter().find(|n| n.name == network).unwrap().id;

        store
            .contracts
            .into_iter()
            .find(|c| c.network_id == network_id && c.address == address)
            .unwrap()
    }

    #[tokio::test]
    pub async fn requires_a_provider_per_network() {
        let config = config(vec![
            network(NETWORK, vec![]),
            network(OTHER_NETWORK, vec![]),
        ]);
        let providers: HashMap<String, Arc<dyn Provider>> =
            HashMap::from([(NETWORK.to_owned(), Arc::new(ScriptedProvider::new(1)) as Arc<dyn Provider>)]);

        let result =
            MultiSyncEngine::new(config, MemoryRepo::new(), Arc::new(RecordingNotifier::new()), providers);

        assert!(matches!(
            result,
            Err(SyncError::Config(ConfigError::MissingProvider(network))) if network == OTHER_NETWORK
        ));
    }

    #[tokio::test]
    pub async fn rejects_unknown_networks() {
        let config = config(vec![network(NETWORK, vec![vesting_contract(100)])]);
        let TestEngine { engine, .. } =
            new_single_network_engine(config, Arc::new(ScriptedProvider::new(200)));

        engine.start().await.unwrap();

        assert!(matches!(
            engine.sync(Some("ethereum")).await,
            Err(SyncError::UnknownNetwork(name)) if name == "ethereum"
        ));
        assert!(matches!(
            engine.get_stats("ethereum").await,
            Err(SyncError::UnknownNetwork(_))
        ));
    }

    #[tokio::test]
    pub async fn seeds_contracts_only_into_an_empty_store() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let config = config(vec![network(
            NETWORK,
            vec![payment_gateway_contract(100), vesting_contract(100).disabled()],
        )]);
        let TestEngine {
            engine,
            repo,
            notifier,
        } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();

        let vesting = find_contract(&repo, VESTING_ADDRESS).await;
        assert!(vesting.disable);
        assert_eq!(vesting.sync_block_number, 100);
        assert!(provider.get_log_requests(VESTING_ADDRESS).is_empty());
        assert_eq!(find_contract(&repo, PAYMENT_GATEWAY_ADDRESS).await.sync_block_number, 190);

        let grown = crate::factory::config(vec![network(
            NETWORK,
            vec![
                payment_gateway_contract(100),
                vesting_contract(100).disabled(),
                pro_rata_contract(100),
            ],
        )]);
        let providers = HashMap::from([(NETWORK.to_owned(), provider as Arc<dyn Provider>)]);
        let restarted = MultiSyncEngine::new(grown, repo.clone(), notifier, providers).unwrap();

        restarted.start().await.unwrap();

        let store = repo.snapshot().await;
        assert_eq!(store.networks.len(), 1);
        assert_eq!(store.contracts.len(), 2);
        assert!(store.contracts.iter().all(|c| c.address != PRO_RATA_ADDRESS));
    }

    #[tokio::test]
    pub async fn hard_reset_reseeds_and_reindexes() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let hash = tx_hash(1);
        provider.add_log(
            event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(2), 130, hash, 0),
            transaction(hash, VESTING_ADDRESS, vesting_claim_input(), 130),
        );
        let config = config(vec![network(NETWORK, vec![vesting_contract(100)])]);
        let TestEngine {
            engine,
            repo,
            notifier,
        } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();
        engine.sync(None).await.unwrap();
        assert_eq!(engine.get_stats(NETWORK).await.unwrap().tick_id, 2);

        engine.hard_reset().await.unwrap();

        let store = repo.snapshot().await;
        assert_eq!(store.networks.len(), 1);
        assert_eq!(store.contracts.len(), 1);
        assert_eq!(store.raw_events.len(), 1);
        assert_eq!(store.transaction_items.len(), 1);
        assert_eq!(store.accounts.len(), 1);

        let vesting = find_contract(&repo, VESTING_ADDRESS).await;
        assert_eq!((vesting.sync_block_number, vesting.process_block_number), (190, 190));
        assert_eq!(provider.get_log_requests(VESTING_ADDRESS), vec![(100, 189), (100, 189)]);
        assert_eq!(notifier.get_events().len(), 2);
        // Token decimals are looked up again after a hard reset
        assert_eq!(provider.get_calls().len(), 4);
        assert_eq!(engine.get_stats(NETWORK).await.unwrap().tick_id, 1);
    }

    #[tokio::test]
    pub async fn networks_sync_independently() {
        let bsc = Arc::new(ScriptedProvider::new(200));
        let polygon = Arc::new(ScriptedProvider::new(5_000));
        polygon.fail_logs_for(PAYMENT_GATEWAY_ADDRESS);
        let config = config(vec![
            network(NETWORK, vec![payment_gateway_contract(100)]),
            network(OTHER_NETWORK, vec![payment_gateway_contract(4_000)]),
        ]);
        let TestEngine { engine, repo, .. } =
            new_engine(config, vec![(NETWORK, bsc), (OTHER_NETWORK, polygon.clone())]);

        engine.start().await.unwrap();

        assert_eq!(
            find_network_contract(&repo, NETWORK, PAYMENT_GATEWAY_ADDRESS).await.sync_block_number,
            190
        );
        assert_eq!(
            find_network_contract(&repo, OTHER_NETWORK, PAYMENT_GATEWAY_ADDRESS)
                .await
                .sync_block_number,
            4_000
        );

        polygon.heal();
        engine.sync(Some(OTHER_NETWORK)).await.unwrap();

        assert_eq!(
            find_network_contract(&repo, OTHER_NETWORK, PAYMENT_GATEWAY_ADDRESS)
                .await
                .sync_block_number,
            4_990
        );

        let stats = engine.get_all_stats().await;
        let ticks: Vec<_> = stats.iter().map(|s| (s.network.as_str(), s.tick_id)).collect();
        assert_eq!(ticks, vec![(NETWORK, 1), (OTHER_NETWORK, 2)]);
    }

    #[tokio::test]
    pub async fn networks_share_accounts() {
        let bsc = Arc::new(ScriptedProvider::new(200));
        let polygon = Arc::new(ScriptedProvider::new(200));
        for (seed, provider) in [(1, &bsc), (2, &polygon)] {
            let hash = tx_hash(seed);
            provider.add_log(
                event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(seed), 150, hash, 0),
                transaction(hash, VESTING_ADDRESS, vesting_claim_input(), 150),
            );
        }
        let config = config(vec![
            network(NETWORK, vec![vesting_contract(100)]),
            network(OTHER_NETWORK, vec![vesting_contract(100)]),
        ]);
        let TestEngine { engine, repo, .. } =
            new_engine(config, vec![(NETWORK, bsc), (OTHER_NETWORK, polygon)]);

        engine.start().await.unwrap();

        let store = repo.snapshot().await;
        assert_eq!(store.accounts.len(), 1);
        assert_eq!(store.transaction_items.len(), 2);
        let account_id = Some(store.accounts[0].id);
        assert!(store.transaction_items.iter().all(|item| matches!(
            item,
            TransactionItem::Vesting(item) if item.account_id == account_id
        )));
    }

    #[tokio::test]
    pub async fn never_processes_past_the_sync_checkpoint() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let config = config(vec![network(
            NETWORK,
            vec![payment_gateway_contract(100), vesting_contract(150), pro_rata_contract(120)],
        )
        .with_block_number_range(30)]);
        let TestEngine { engine, repo, .. } = new_single_network_engine(config, provider.clone());

        engine.start().await.unwrap();
        for (seed, head) in [(1, 240), (2, 300), (3, 420)] {
            let hash = tx_hash(seed);
            provider.add_log(
                event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(seed), head - 20, hash, 0),
                transaction(hash, VESTING_ADDRESS, vesting_claim_input(), head - 20),
            );
            provider.set_block_number(head);

            engine.sync(None).await.unwrap();

            for contract in repo.snapshot().await.contracts {
                assert!(
                    contract.process_block_number <= contract.sync_block_number,
                    "{} processed past its sync checkpoint",
                    contract.get_name()
                );
                assert_eq!(contract.sync_block_number, head - 10);
            }
        }

        assert_eq!(repo.snapshot().await.transaction_items.len(), 3);
    }

    #[tokio::test]
    pub async fn reports_monitoring_stats() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let config = config(vec![network(
            NETWORK,
            vec![payment_gateway_contract(100), vesting_contract(150)],
        )]);
        let TestEngine { engine, .. } = new_single_network_engine(config, provider);

        engine.start().await.unwrap();
        engine.sync(None).await.unwrap();

        let stats = engine.get_stats(NETWORK).await.unwrap();
        let monitoring = &stats.monitoring.stats;
        assert_eq!(monitoring.chain_block_number, Some(200));
        assert_eq!(monitoring.sync_block_number, Some(190));
        assert_eq!(monitoring.process_block_number, Some(190));
        assert_eq!(monitoring.contracts_remains, 0);
        assert!(monitoring.started_at.is_some());

        assert_eq!(stats.db.stats.contracts.len(), 2);
        assert_eq!(stats.indexer.success_count, 2);
    }

    #[tokio::test]
    pub async fn scheduler_ticks_until_stopped() {
        let provider = Arc::new(ScriptedProvider::new(200));
        let config =
            config(vec![network(NETWORK, vec![vesting_contract(100)])]).with_tick_interval_ms(10);
        let TestEngine { engine, .. } = new_single_network_engine(config, provider);

        engine.start().await.unwrap();
        engine.spawn_scheduler().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.stop().await;

        let tick_id = engine.get_stats(NETWORK).await.unwrap().tick_id;
        assert!(tick_id > 2, "scheduler only reached tick {tick_id}");

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(engine.get_stats(NETWORK).await.unwrap().tick_id, tick_id);
    }
}
