use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tokio_postgres::types::ToSql;
use tokio_postgres::GenericClient;

use crate::accounts::Account;
use crate::contracts::{Contract, UnsavedContract};
use crate::events::{ProcessableEvent, RawBlock, RawEvent, RawTransaction};
use crate::networks::Network;
use crate::repos::repo::{ContractRowStats, RepoError, SQLikeMigrations, TableRowCounts};
use crate::transaction_items::{TransactionItem, TransactionItemCounts};

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

impl From<tokio_postgres::Error> for RepoError {
    fn from(value: tokio_postgres::Error) -> Self {
        if value.is_closed() {
            RepoError::NotConnected
        } else {
            RepoError::Unknown(value.to_string())
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        RepoError::Unknown(value.to_string())
    }
}

async fn execute<C: GenericClient + Sync>(
    client: &C,
    query: &str,
    params: Params<'_>,
) -> Result<u64, RepoError> {
    Ok(client.execute(query, params).await?)
}

async fn load_data_list<C: GenericClient + Sync, Data: DeserializeOwned>(
    client: &C,
    query: &str,
    params: Params<'_>,
) -> Result<Vec<Data>, RepoError> {
    let rows = client.query(json_aggregate_query(query).as_str(), params).await?;
    let json_aggregate: serde_json::Value = match rows.first() {
        Some(row) => row.try_get(0)?,
        None => return Ok(vec![]),
    };

    if json_aggregate.is_array() {
        Ok(serde_json::from_value(json_aggregate)?)
    } else {
        Ok(vec![])
    }
}

async fn load_data<C: GenericClient + Sync, Data: DeserializeOwned>(
    client: &C,
    query: &str,
    params: Params<'_>,
) -> Result<Option<Data>, RepoError> {
    let mut data_list: Vec<Data> = load_data_list(client, query, params).await?;

    Ok(data_list.pop())
}

async fn count<C: GenericClient + Sync>(
    client: &C,
    query: &str,
    params: Params<'_>,
) -> Result<u64, RepoError> {
    let row = client.query_one(query, params).await?;
    let count: i64 = row.try_get(0)?;

    Ok(count as u64)
}

fn json_aggregate_query(query: &str) -> String {
    format!("WITH result AS ({query}) SELECT COALESCE(json_agg(result), '[]'::json) FROM result",)
}

fn as_i64(values: &[u64]) -> Vec<i64> {
    values.iter().map(|v| *v as i64).collect()
}

pub async fn migrate<C: GenericClient + Sync>(client: &C) -> Result<(), RepoError> {
    for migration in SQLikeMigrations::get_internal_migrations() {
        execute(client, migration, &[]).await?;
    }

    Ok(())
}

pub async fn load_network<C: GenericClient + Sync>(
    client: &C,
    name: &str,
) -> Result<Option<Network>, RepoError> {
    load_data(client, "SELECT * FROM networks WHERE name = $1", &[&name]).await
}

pub async fn create_network<C: GenericClient + Sync>(
    client: &C,
    name: &str,
) -> Result<Network, RepoError> {
    let row = client
        .query_one(
            "INSERT INTO networks (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
            &[&name],
        )
        .await?;

    Ok(Network {
        id: row.try_get(0)?,
        name: name.to_owned(),
    })
}

pub async fn count_contracts<C: GenericClient + Sync>(client: &C) -> Result<u64, RepoError> {
    count(client, "SELECT COUNT(*) FROM contracts", &[]).await
}

pub async fn create_contract<C: GenericClient + Sync>(
    client: &C,
    contract: &UnsavedContract,
) -> Result<Contract, RepoError> {
    let contract_type = contract.contract_type.to_string();
    let start_block_number = contract.start_block_number as i64;

    let row = client
        .query_one(
            "INSERT INTO contracts
                (network_id, address, contract_type, name, sync_block_number, process_block_number, disable)
             VALUES ($1, $2, $3, $4, $5, $5, $6)
             RETURNING id",
            &[
                &contract.network_id,
                &contract.address,
                &contract_type,
                &contract.name,
                &start_block_number,
                &contract.disable,
            ],
        )
        .await?;

    Ok(Contract {
        id: row.try_get(0)?,
        network_id: contract.network_id,
        address: contract.address.clone(),
        contract_type: contract.contract_type,
        name: contract.name.clone(),
        sync_block_number: contract.start_block_number,
        process_block_number: contract.start_block_number,
        disable: contract.disable,
    })
}

pub async fn load_contracts<C: GenericClient + Sync>(
    client: &C,
    network_id: i32,
) -> Result<Vec<Contract>, RepoError> {
    load_data_list(
        client,
        "SELECT * FROM contracts WHERE network_id = $1 ORDER BY id",
        &[&network_id],
    )
    .await
}

pub async fn load_contract<C: GenericClient + Sync>(
    client: &C,
    contract_id: i32,
) -> Result<Option<Contract>, RepoError> {
    load_data(client, "SELECT * FROM contracts WHERE id = $1", &[&contract_id]).await
}

pub async fn update_sync_block_number<C: GenericClient + Sync>(
    client: &C,
    contract_id: i32,
    block_number: u64,
) -> Result<(), RepoError> {
    let block_number = block_number as i64;

    execute(
        client,
        "UPDATE contracts SET sync_block_number = $2 WHERE id = $1",
        &[&contract_id, &block_number],
    )
    .await
    .map(|_| ())
}

pub async fn update_process_block_number<C: GenericClient + Sync>(
    client: &C,
    contract_id: i32,
    block_number: u64,
) -> Result<(), RepoError> {
    let block_number = block_number as i64;

    execute(
        client,
        "UPDATE contracts SET process_block_number = $2 WHERE id = $1",
        &[&contract_id, &block_number],
    )
    .await
    .map(|_| ())
}

pub async fn load_raw_block_numbers<C: GenericClient + Sync>(
    client: &C,
    network_id: i32,
    block_numbers: &[u64],
) -> Result<HashSet<u64>, RepoError> {
    let block_numbers = as_i64(block_numbers);
    let rows = client
        .query(
            "SELECT number FROM raw_blocks WHERE network_id = $1 AND number = ANY($2)",
            &[&network_id, &block_numbers],
        )
        .await?;

    rows.iter()
        .map(|row| Ok(row.try_get::<_, i64>(0)? as u64))
        .collect()
}

pub async fn load_raw_transaction_hashes<C: GenericClient + Sync>(
    client: &C,
    network_id: i32,
    hashes: &[String],
) -> Result<HashSet<String>, RepoError> {
    let hashes = hashes.to_vec();
    let rows = client
        .query(
            "SELECT hash FROM raw_transactions WHERE network_id = $1 AND hash = ANY($2)",
            &[&network_id, &hashes],
        )
        .await?;

    rows.iter().map(|row| Ok(row.try_get(0)?)).collect()
}

pub async fn create_raw_blocks<C: GenericClient + Sync>(
    client: &C,
    blocks: &[RawBlock],
) -> Result<(), RepoError> {
    for block in blocks {
        let number = block.number as i64;

        execute(
            client,
            "INSERT INTO raw_blocks (network_id, number, hash, timestamp)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT DO NOTHING",
            &[&block.network_id, &number, &block.hash, &block.timestamp],
        )
        .await?;
    }

    Ok(())
}

pub async fn create_raw_transactions<C: GenericClient + Sync>(
    client: &C,
    transactions: &[RawTransaction],
) -> Result<(), RepoError> {
    for transaction in transactions {
        let block_number = transaction.block_number as i64;

        execute(
            client,
            "INSERT INTO raw_transactions (network_id, hash, block_number, \"from\", \"to\", input)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT DO NOTHING",
            &[
                &transaction.network_id,
                &transaction.hash,
                &block_number,
                &transaction.from,
                &transaction.to,
                &transaction.input,
            ],
        )
        .await?;
    }

    Ok(())
}

pub async fn create_raw_events<C: GenericClient + Sync>(
    client: &C,
    events: &[RawEvent],
) -> Result<(), RepoError> {
    for event in events {
        let block_number = event.block_number as i64;
        let log_index = event.log_index as i64;

        execute(
            client,
            "INSERT INTO raw_events
                (id, network_id, contract_id, contract_address, transaction_hash, block_number,
                 log_index, topic0, topic1, topic2, topic3, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT DO NOTHING",
            &[
                &event.id,
                &event.network_id,
                &event.contract_id,
                &event.contract_address,
                &event.transaction_hash,
                &block_number,
                &log_index,
                &event.topic0,
                &event.topic1,
                &event.topic2,
                &event.topic3,
                &event.data,
            ],
        )
        .await?;
    }

    Ok(())
}

pub async fn load_processable_events<C: GenericClient + Sync>(
    client: &C,
    contract_id: i32,
    from: u64,
    to: u64,
) -> Result<Vec<ProcessableEvent>, RepoError> {
    let (from, to) = (from as i64, to as i64);

    let mut events: Vec<ProcessableEvent> = load_data_list(
        client,
        "SELECT e.id, e.network_id, e.contract_id, e.contract_address, e.transaction_hash,
                e.block_number, e.log_index, e.topic0, e.topic1, e.topic2, e.topic3, e.data,
                t.input, b.timestamp AS block_timestamp
         FROM raw_events e
         LEFT JOIN raw_transactions t
            ON t.network_id = e.network_id AND t.hash = e.transaction_hash
         LEFT JOIN raw_blocks b
            ON b.network_id = e.network_id AND b.number = e.block_number
         WHERE e.contract_id = $1 AND e.block_number BETWEEN $2 AND $3
         ORDER BY e.block_number, e.log_index",
        &[&contract_id, &from, &to],
    )
    .await?;

    events.sort_by_key(|e| (e.event.block_number, e.event.log_index));

    Ok(events)
}

pub async fn load_account<C: GenericClient + Sync>(
    client: &C,
    address: &str,
) -> Result<Option<Account>, RepoError> {
    load_data(client, "SELECT * FROM accounts WHERE address = $1", &[&address]).await
}

pub async fn create_account<C: GenericClient + Sync>(
    client: &C,
    address: &str,
) -> Result<Account, RepoError> {
    let row = client
        .query_one(
            "INSERT INTO accounts (address) VALUES ($1)
             ON CONFLICT (address) DO UPDATE SET address = EXCLUDED.address
             RETURNING id",
            &[&address],
        )
        .await?;

    Ok(Account {
        id: row.try_get(0)?,
        address: address.to_owned(),
    })
}

pub async fn create_transaction_item<C: GenericClient + Sync>(
    client: &C,
    item: &TransactionItem,
) -> Result<(), RepoError> {
    let account_id = get_account_id(item)?;
    let source = item.get_source();
    let block_number = source.block_number as i64;

    match item {
        TransactionItem::PaymentGateway(item) => {
            execute(
                client,
                "INSERT INTO payment_gateway_transaction_items
                    (network_id, contract_id, raw_event_id, transaction_hash, block_number,
                     account_id, account, amount, user_id, transaction_id, is_sig, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                &[
                    &source.network_id,
                    &source.contract_id,
                    &source.raw_event_id,
                    &source.transaction_hash,
                    &block_number,
                    &account_id,
                    &item.account,
                    &item.amount,
                    &item.user_id,
                    &item.transaction_id,
                    &item.is_sig,
                    &item.timestamp,
                ],
            )
            .await?;
        }
        TransactionItem::Vesting(item) => {
            let kind = serde_json::to_value(item.kind)?.as_str().unwrap_or_default().to_owned();

            execute(
                client,
                "INSERT INTO vesting_transaction_items
                    (network_id, contract_id, raw_event_id, transaction_hash, block_number,
                     kind, account_id, account, amount, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                &[
                    &source.network_id,
                    &source.contract_id,
                    &source.raw_event_id,
                    &source.transaction_hash,
                    &block_number,
                    &kind,
                    &account_id,
                    &item.account,
                    &item.amount,
                    &item.timestamp,
                ],
            )
            .await?;
        }
        TransactionItem::ProRata(item) => {
            let kind = serde_json::to_value(item.kind)?.as_str().unwrap_or_default().to_owned();

            execute(
                client,
                "INSERT INTO pro_rata_transaction_items
                    (network_id, contract_id, raw_event_id, transaction_hash, block_number,
                     kind, account_id, account, amount, transaction_id, is_sig, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
                &[
                    &source.network_id,
                    &source.contract_id,
                    &source.raw_event_id,
                    &source.transaction_hash,
                    &block_number,
                    &kind,
                    &account_id,
                    &item.account,
                    &item.amount,
                    &item.transaction_id,
                    &item.is_sig,
                    &item.timestamp,
                ],
            )
            .await?;
        }
    }

    Ok(())
}

fn get_account_id(item: &TransactionItem) -> Result<i32, RepoError> {
    match item {
        TransactionItem::PaymentGateway(item) => item.account_id,
        TransactionItem::Vesting(item) => item.account_id,
        TransactionItem::ProRata(item) => item.account_id,
    }
    .ok_or_else(|| RepoError::Unknown(format!("{} has no stored account", item.get_account())))
}

pub async fn count_rows<C: GenericClient + Sync>(
    client: &C,
    network_id: i32,
) -> Result<TableRowCounts, RepoError> {
    let contracts = load_contracts(client, network_id).await?;
    let by_network = |table: &str| format!("SELECT COUNT(*) FROM {table} WHERE network_id = $1");

    Ok(TableRowCounts {
        contracts: contracts.iter().map(ContractRowStats::from).collect(),
        raw_blocks: count(client, &by_network("raw_blocks"), &[&network_id]).await?,
        raw_transactions: count(client, &by_network("raw_transactions"), &[&network_id]).await?,
        raw_events: count(client, &by_network("raw_events"), &[&network_id]).await?,
        accounts: count(client, "SELECT COUNT(*) FROM accounts", &[]).await?,
        transaction_items: TransactionItemCounts {
            payment_gateway: count(
                client,
                &by_network("payment_gateway_transaction_items"),
                &[&network_id],
            )
            .await?,
            vesting: count(client, &by_network("vesting_transaction_items"), &[&network_id])
                .await?,
            pro_rata: count(client, &by_network("pro_rata_transaction_items"), &[&network_id])
                .await?,
        },
    })
}

pub async fn soft_reset<C: GenericClient + Sync>(client: &C) -> Result<(), RepoError> {
    for query in SQLikeMigrations::truncate_transaction_items() {
        execute(client, query, &[]).await?;
    }

    Ok(())
}

pub async fn hard_reset<C: GenericClient + Sync>(client: &C) -> Result<(), RepoError> {
    for query in SQLikeMigrations::truncate_all() {
        execute(client, query, &[]).await?;
    }

    Ok(())
}
