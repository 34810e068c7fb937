pub enum ConfigError {
    NoNetwork,
    DuplicateNetwork(String),
    DuplicateContract { network: String, address: String },
    InvalidAddress(String),
    ZeroBlockNumberRange(String),
    ZeroTickDivider(String),
    MissingProvider(String),
    InvalidJsonRpcUrl(String),
}

impl std::fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoNetwork => {
                write!(f, "At least one network is required")
            }
            ConfigError::DuplicateNetwork(network) => {
                write!(f, "Network {network} is configured more than once")
            }
            ConfigError::DuplicateContract { network, address } => {
                write!(f, "Contract {address} is configured more than once on {network}")
            }
            ConfigError::InvalidAddress(address) => {
                write!(f, "{address} is not a valid contract address")
            }
            ConfigError::ZeroBlockNumberRange(network) => {
                write!(f, "Block number range of {network} must be greater than zero")
            }
            ConfigError::ZeroTickDivider(network) => {
                write!(f, "Tick dividers of {network} must be greater than zero")
            }
            ConfigError::MissingProvider(network) => {
                write!(f, "No provider was given for {network}")
            }
            ConfigError::InvalidJsonRpcUrl(url) => {
                write!(f, "{url} is not a valid JSON-RPC url")
            }
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ConfigError {}
