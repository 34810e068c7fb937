// These share one database: run with `--ignored --test-threads=1` and a
// reachable TEST_DATABASE_URL.

#[cfg(test)]
mod networks_and_contracts {
    use launchpad_indexer::{ContractType, Repo, RepoClient, UnsavedContract};

    use crate::factory::*;
    use crate::test_runner;

    #[tokio::test]
    #[ignore]
    pub async fn creates_networks_once() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();

            let created = client.create_network(NETWORK).await.unwrap();
            let recreated = client.create_network(NETWORK).await.unwrap();

            assert_eq!(created, recreated);
            assert_eq!(client.load_network(NETWORK).await.unwrap(), Some(created));
            assert_eq!(client.load_network(OTHER_NETWORK).await.unwrap(), None);
        })
        .await;
    }

    #[tokio::test]
    #[ignore]
    pub async fn creates_contracts_at_their_start_block() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();
            let network = client.create_network(NETWORK).await.unwrap();
            let mut config = vesting_contract(300);
            config.address = "0x8a90CAb2b38dba80c64b7734e58Ee1dB38B8993e".to_owned();

            let contract =
                client.create_contract(&UnsavedContract::new(network.id, &config)).await.unwrap();

            assert_eq!(contract.address, "0x8a90cab2b38dba80c64b7734e58ee1db38b8993e");
            assert_eq!(contract.contract_type, ContractType::Vesting);
            assert_eq!(contract.name.as_deref(), Some("vesting"));
            assert_eq!((contract.sync_block_number, contract.process_block_number), (300, 300));
            assert!(!contract.disable);
            assert_eq!(client.count_contracts().await.unwrap(), 1);
            assert_eq!(client.load_contracts(network.id).await.unwrap(), vec![contract]);
        })
        .await;
    }

    #[tokio::test]
    #[ignore]
    pub async fn updates_checkpoints() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();
            let network = client.create_network(NETWORK).await.unwrap();
            let contract = client
                .create_contract(&UnsavedContract::new(network.id, &payment_gateway_contract(100)))
                .await
                .unwrap();

            client.update_sync_block_number(contract.id, 190).await.unwrap();
            client.update_process_block_number(contract.id, 150).await.unwrap();

            let contract = client.load_contract(contract.id).await.unwrap().unwrap();
            assert_eq!((contract.sync_block_number, contract.process_block_number), (190, 150));
        })
        .await;
    }
}

#[cfg(test)]
mod transactions {
    use launchpad_indexer::{LaunchpadRepo, Repo, RepoClient};

    use crate::factory::*;
    use crate::test_runner;

    #[tokio::test]
    #[ignore]
    pub async fn commits_transactions() {
        test_runner::run_test(|repo| async move {
            let mut client = repo.get_client().await.unwrap();

            let txn = LaunchpadRepo::get_txn_client(&mut client).await.unwrap();
            txn.create_network(NETWORK).await.unwrap();
            LaunchpadRepo::commit_txn(txn).await.unwrap();

            assert!(client.load_network(NETWORK).await.unwrap().is_some());
        })
        .await;
    }

    #[tokio::test]
    #[ignore]
    pub async fn rolls_back_dropped_transactions() {
        test_runner::run_test(|repo| async move {
            let mut client = repo.get_client().await.unwrap();

            {
                let txn = LaunchpadRepo::get_txn_client(&mut client).await.unwrap();
                txn.create_network(NETWORK).await.unwrap();
            }

            assert!(client.load_network(NETWORK).await.unwrap().is_none());
        })
        .await;
    }
}

#[cfg(test)]
mod raw_rows {
    use std::collections::HashSet;

    use ethers::types::{Block, TxHash};
    use launchpad_indexer::events::{RawBlock, RawEvent, RawTransaction};
    use launchpad_indexer::{Repo, RepoClient, UnsavedContract};

    use crate::factory::*;
    use crate::test_runner;

    #[tokio::test]
    #[ignore]
    pub async fn stores_raw_rows_once_and_joins_them_for_processing() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();
            let network = client.create_network(NETWORK).await.unwrap();
            let contract = client
                .create_contract(&UnsavedContract::new(network.id, &vesting_contract(100)))
                .await
                .unwrap();

            let hash = tx_hash(1);
            let log = event_log(VESTING_ADDRESS, CLAIM_EVENT, ACCOUNT, tokens(2), 120, hash, 3);
            let event = RawEvent::new(&log, &contract).unwrap();
            let transaction = RawTransaction::new(
                &transaction(hash, VESTING_ADDRESS, vesting_claim_input(), 120),
                network.id,
                120,
            );
            let block = RawBlock::new(
                &Block::<TxHash> {
                    timestamp: 1_700_000_360u64.into(),
                    ..Default::default()
                },
                network.id,
                120,
            );

            for _ in 0..2 {
                client.create_raw_blocks(&[block.clone()]).await.unwrap();
                client.create_raw_transactions(&[transaction.clone()]).await.unwrap();
                client.create_raw_events(&[event.clone()]).await.unwrap();
            }

            let counts = client.count_rows(network.id).await.unwrap();
            assert_eq!(
                (counts.raw_blocks, counts.raw_transactions, counts.raw_events),
                (1, 1, 1)
            );
            assert_eq!(
                client.load_raw_block_numbers(network.id, &[119, 120]).await.unwrap(),
                HashSet::from([120])
            );
            assert_eq!(
                client
                    .load_raw_transaction_hashes(network.id, &[transaction.hash.clone()])
                    .await
                    .unwrap()
                    .len(),
                1
            );

            let events = client.load_processable_events(contract.id, 100, 189).await.unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].event, event);
            assert_eq!(events[0].input, transaction.input);
            assert_eq!(events[0].block_timestamp, Some(1_700_000_360));

            assert!(client.load_processable_events(contract.id, 121, 189).await.unwrap().is_empty());
        })
        .await;
    }
}

#[cfg(test)]
mod accounts_and_items {
    use launchpad_indexer::transaction_items::{
        ItemSource, TransactionItem, VestingItemKind, VestingTransactionItem,
    };
    use launchpad_indexer::{Repo, RepoClient, UnsavedContract};
    use uuid::Uuid;

    use crate::factory::*;
    use crate::test_runner;

    #[tokio::test]
    #[ignore]
    pub async fn creates_accounts_once_per_address() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();

            let account = client.create_account(ACCOUNT).await.unwrap();

            assert_eq!(client.create_account(ACCOUNT).await.unwrap(), account);
            assert_eq!(client.load_account(ACCOUNT).await.unwrap(), Some(account));
        })
        .await;
    }

    #[tokio::test]
    #[ignore]
    pub async fn soft_reset_drops_items_and_rewinds_processing() {
        test_runner::run_test(|repo| async move {
            let client = repo.get_client().await.unwrap();
            let network = client.create_network(NETWORK).await.unwrap();
            let contract = client
                .create_contract(&UnsavedContract::new(network.id, &vesting_contract(100)))
                .await
                .unwrap();
            client.update_sync_block_number(contract.id, 500).await.unwrap();
            client.update_process_block_number(contract.id, 500).await.unwrap();
            let account = client.create_account(ACCOUNT).await.unwrap();

            let item = TransactionItem::Vesting(VestingTransactionItem {
                source: ItemSource {
                    network_id: network.id,
                    contract_id: contract.id,
                    raw_event_id: Uuid::new_v4(),
                    transaction_hash: format!("{:?}", tx_hash(1)),
                    block_number: 320,
                },
                kind: VestingItemKind::Claim,
                account: ACCOUNT.to_owned(),
                account_id: None,
                amount: 2.5,
                timestamp: 1_700_000_960,
            })
            .with_account(&account);
            client.create_transaction_item(&item).await.unwrap();

            assert_eq!(client.count_rows(network.id).await.unwrap().transaction_items.vesting, 1);

            client.soft_reset().await.unwrap();

            let counts = client.count_rows(network.id).await.unwrap();
            assert_eq!(counts.transaction_items.vesting, 0);
            assert_eq!(counts.accounts, 0);
            let contract = client.load_contract(contract.id).await.unwrap().unwrap();
            assert_eq!((contract.sync_block_number, contract.process_block_number), (500, 0));
        })
        .await;
    }
}

#[cfg(test)]
mod shared_accounts {
    use std::collections::HashMap;
    use std::sync::Arc;

    use launchpad_indexer::{MultiSyncEngine, Provider, Repo, RepoClient};

    use crate::factory::*;
    use crate::test_runner;

    fn add_deposits(provider: &ScriptedProvider, count: u64) {
        for seed in 1..=count {
            let hash = tx_hash(seed);
            let block_number = 100 + seed * 10;
            let input = payment_gateway_deposit_sig_input(
                &format!("user-{seed}"),
                &format!("tx-{seed}"),
                ACCOUNT,
                tokens(seed),
            );

            provider.add_log(
                event_log(
                    PAYMENT_GATEWAY_ADDRESS,
                    DEPOSIT_EVENT,
                    ACCOUNT,
                    tokens(seed),
                    block_number,
                    hash,
                    0,
                ),
                transaction(hash, PAYMENT_GATEWAY_ADDRESS, input, block_number),
            );
        }
    }

    #[tokio::test]
    #[ignore]
    pub async fn networks_create_the_same_account_without_blocking_each_other() {
        test_runner::run_test(|repo| async move {
            let bsc = Arc::new(ScriptedProvider::new(200));
            let polygon = Arc::new(ScriptedProvider::new(200));
            add_deposits(&bsc, 6);
            add_deposits(&polygon, 6);
            let config = config(vec![
                network(NETWORK, vec![payment_gateway_contract(100)]),
                network(OTHER_NETWORK, vec![payment_gateway_contract(100)]),
            ])
            .with_repo_timeout_ms(3_000);
            let providers = HashMap::from([
                (NETWORK.to_owned(), bsc as Arc<dyn Provider>),
                (OTHER_NETWORK.to_owned(), polygon as Arc<dyn Provider>),
            ]);
            let engine = MultiSyncEngine::new(
                config,
                repo.clone(),
                Arc::new(RecordingNotifier::new()),
                providers,
            )
            .unwrap();

            engine.start().await.unwrap();

            for stats in engine.get_all_stats().await {
                assert_eq!(stats.indexer.error_count, 0, "{} failed to index", stats.network);
            }

            let client = repo.get_client().await.unwrap();
            for name in [NETWORK, OTHER_NETWORK] {
                let network = client.load_network(name).await.unwrap().unwrap();
                let counts = client.count_rows(network.id).await.unwrap();

                assert_eq!(counts.transaction_items.payment_gateway, 6);
                assert_eq!(counts.accounts, 1);
            }
        })
        .await;
    }
}
