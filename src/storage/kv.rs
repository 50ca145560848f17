use std::{
    collections::HashMap,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Interface for abstracting the string-keyed storage the store mirrors itself into.
pub trait KeyValueStorage {
    /// Reads a slot. A slot that was never written reads as `None`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Replaces the whole content of a slot.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>>;

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> KeyValueStorage for T
where
    T::Target: KeyValueStorage,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> {
        self.deref().set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> {
        self.deref().remove(key)
    }
}

/// Keeps every slot in its own file inside a directory.
pub struct FileKeyValueStorage {
    slot_dir: PathBuf,
}

impl FileKeyValueStorage {
    pub fn new(slot_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&slot_dir)?;

        Ok(Self { slot_dir })
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(anyhow!("Illegal slot name {key:?}"));
        }
        Ok(self.slot_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileKeyValueStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        debug!("Reading slot {path:?}");
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };

        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result?;

        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.slot_path(key)?;
        debug!("Writing slot {path:?}");
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;

        // Truncating before holding the lock could cut off a concurrent reader.
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.rewind().await?;
            file.write_all(value.as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        match tokio::fs::remove_file(path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)?,
        }
    }
}

/// Keeps slots in memory. Useful for embedding the store without a disk and for tests.
#[derive(Default)]
pub struct MemoryKeyValueStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| anyhow!("Memory storage lock was poisoned"))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.slots()?.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}

impl KeyValueStorage for MemoryKeyValueStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.slots()?.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.slots()?.remove(key);
        Ok(())
    }
}
