use anyhow::Result;

use crate::storage::kv::KeyValueStorage;

use super::command::PersistCommand;

/// Represents a command processor. Realistically this abstracts over where snapshots end up.
pub trait CommandProcessor {
    fn process_next(
        &mut self,
        command: PersistCommand,
    ) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}

/// Bridges [PersistenceModule](super::PersistenceModule) and [KeyValueStorage].
pub struct StorageWriter<S: KeyValueStorage> {
    storage: S,
    applied: usize,
}

impl<S: KeyValueStorage> StorageWriter<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            applied: 0,
        }
    }

    pub fn applied(&self) -> usize {
        self.applied
    }
}

impl<S: KeyValueStorage> CommandProcessor for StorageWriter<S> {
    async fn process_next(&mut self, command: PersistCommand) -> Result<()> {
        match command {
            PersistCommand::Write { key, snapshot } => {
                self.storage.set(key.as_str(), snapshot).await?
            }
            PersistCommand::Remove { key } => self.storage.remove(key.as_str()).await?,
        }
        self.applied += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
