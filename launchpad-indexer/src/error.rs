use std::future::Future;
use std::time::Duration;

use derive_more::Display;
use tokio::time::timeout;

use crate::bus::NotifierError;
use crate::config::ConfigError;
use crate::decoding::DecodeError;
use crate::ingester::ProviderError;
use crate::repos::RepoError;

/// Every failure a worker tick can surface.
#[derive(Debug, Display)]
pub enum SyncError {
    #[display("Provider Error: {_0}")]
    Provider(String),
    #[display("Timed out: {_0}")]
    Timeout(String),
    #[display("Decode Error: {_0}")]
    Decode(DecodeError),
    #[display("Repo Error: {_0}")]
    Repo(RepoError),
    #[display("Notifier Error: {_0}")]
    Notifier(NotifierError),
    #[display("Config Error: {_0}")]
    Config(ConfigError),
    #[display("Unknown network: {_0}")]
    UnknownNetwork(String),
    #[display("Rejected chain head reading: {_0}")]
    RejectedBlockNumber(u64),
}

impl std::error::Error for SyncError {}

impl SyncError {
    /// Transient failures are expected to clear on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Provider(_) | SyncError::Timeout(_) | SyncError::RejectedBlockNumber(_)
        )
    }
}

impl From<ProviderError> for SyncError {
    fn from(value: ProviderError) -> Self {
        SyncError::Provider(value.to_string())
    }
}

impl From<DecodeError> for SyncError {
    fn from(value: DecodeError) -> Self {
        SyncError::Decode(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        SyncError::Repo(value)
    }
}

impl From<NotifierError> for SyncError {
    fn from(value: NotifierError) -> Self {
        SyncError::Notifier(value)
    }
}

impl From<ConfigError> for SyncError {
    fn from(value: ConfigError) -> Self {
        SyncError::Config(value)
    }
}

/// Bounds an RPC or storage call so a hung peer only costs one tick.
pub async fn timed<T, E>(
    duration: Duration,
    operation: &str,
    future: impl Future<Output = Result<T, E>>,
) -> Result<T, SyncError>
where
    SyncError: From<E>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(SyncError::from),
        Err(_elapsed) => Err(SyncError::Timeout(format!(
            "{operation} took longer than {}ms",
            duration.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    pub async fn times_out_hung_operations() {
        let result = timed(Duration::from_millis(5), "get_block_number", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, RepoError>(())
        })
        .await;

        assert!(matches!(result, Err(SyncError::Timeout(_))));
        assert!(result.unwrap_err().is_transient());
    }

    #[tokio::test]
    pub async fn passes_errors_through() {
        let result = timed(Duration::from_secs(1), "count_rows", async {
            Err::<(), _>(RepoError::NotConnected)
        })
        .await;

        assert!(matches!(result, Err(SyncError::Repo(RepoError::NotConnected))));
    }
}
