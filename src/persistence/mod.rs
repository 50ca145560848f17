use anyhow::Result;
use command::PersistCommand;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error};
use writer::CommandProcessor;

pub mod command;
pub mod writer;

/// Receives snapshots from the store and writes them out in the background. Failed writes are
/// logged and skipped, the next snapshot of the same slot supersedes them anyway.
pub struct PersistenceModule<Processor> {
    receiver: UnboundedReceiver<PersistCommand>,
    processor: Processor,
}

impl<P: CommandProcessor> PersistenceModule<P> {
    pub fn new(receiver: UnboundedReceiver<PersistCommand>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    /// Runs until every sender, meaning the store, is dropped.
    pub async fn run(mut self) -> Result<P> {
        while let Some(command) = self.receiver.recv().await {
            let key = command.key();
            match self.processor.process_next(command).await {
                Ok(_) => debug!("Persisted slot {key}"),
                Err(e) => error!("Failed to persist slot {key}: {e:?}"),
            }
        }

        self.receiver.close();
        self.processor.finalize().await?;
        Ok(self.processor)
    }
}
