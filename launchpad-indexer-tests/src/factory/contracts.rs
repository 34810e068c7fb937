use launchpad_indexer::{Config, ContractConfig, ContractType, NetworkConfig, TickDividers};

pub const NETWORK: &str = "bsc";
pub const OTHER_NETWORK: &str = "polygon";

pub const PAYMENT_GATEWAY_ADDRESS: &str = "0x0000000000000000000000000000000000000abc";
pub const VESTING_ADDRESS: &str = "0x0000000000000000000000000000000000000def";
pub const PRO_RATA_ADDRESS: &str = "0x00000000000000000000000000000000000001a2";
pub const TOKEN_ADDRESS: &str = "0x00000000000000000000000000000000000070c0";

pub fn payment_gateway_contract(block_number: u64) -> ContractConfig {
    ContractConfig::new(PAYMENT_GATEWAY_ADDRESS, ContractType::PaymentGateway, block_number)
        .with_name("payment gateway")
}

pub fn vesting_contract(block_number: u64) -> ContractConfig {
    ContractConfig::new(VESTING_ADDRESS, ContractType::Vesting, block_number).with_name("vesting")
}

pub fn pro_rata_contract(block_number: u64) -> ContractConfig {
    ContractConfig::new(PRO_RATA_ADDRESS, ContractType::ProRata, block_number).with_name("pro rata")
}

/// Every worker runs on every tick and the chain head is trusted as read.
pub fn network(name: &str, contracts: Vec<ContractConfig>) -> NetworkConfig {
    contracts
        .into_iter()
        .fold(NetworkConfig::new(name, "http://localhost:8545"), |network, contract| {
            network.add_contract(contract)
        })
        .with_tick_dividers(TickDividers {
            indexer: 1,
            db: 1,
            monitoring: 1,
        })
}

pub fn config(networks: Vec<NetworkConfig>) -> Config {
    networks
        .into_iter()
        .fold(Config::new(), |config, network| config.add_network(network))
        .with_rpc_timeout_ms(1_000)
        .with_repo_timeout_ms(1_000)
}
