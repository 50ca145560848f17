use crate::storage::slots::SlotKey;

/// A single change the store wants mirrored to storage. Writes always carry a complete snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCommand {
    Write { key: SlotKey, snapshot: String },
    Remove { key: SlotKey },
}

impl PersistCommand {
    pub fn key(&self) -> SlotKey {
        match self {
            PersistCommand::Write { key, .. } | PersistCommand::Remove { key } => *key,
        }
    }
}
