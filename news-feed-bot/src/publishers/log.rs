use crate::traits::ChannelPublisher;
use crate::types::Result;
use async_trait::async_trait;
use tracing::info;

/// Publisher for dry runs: the message only goes to the log.
#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl ChannelPublisher for LogPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        info!("Dry run, would publish:\n{}", message);
        Ok(())
    }
}
