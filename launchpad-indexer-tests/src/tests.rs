mod indexer_worker;
mod multi_sync_engine;
