//! A file-backed storage backend

use super::AsyncCredentialStorage;
use aliri_clock::{Clock, DurationSecs, System, UnixTime};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::{error, io};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Credential storage persisted as a single JSON document on disk
///
/// Each entry carries its absolute expiry, so a pair written by one process
/// remains honored by the next. On Unix the document is written with
/// owner-only permissions.
///
/// Writes are serialized through an internal lock; concurrent writers in the
/// same process cannot tear the document.
#[derive(Debug)]
pub struct FileStorage<C = System> {
    path: PathBuf,
    write_guard: Mutex<()>,
    clock: C,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at: UnixTime,
}

type Document = HashMap<String, StoredEntry>;

impl FileStorage {
    /// Constructs storage over the document at `path` against the system clock
    ///
    /// The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
            clock: System,
        }
    }
}

impl<C> FileStorage<C> {
    /// Replaces the clock used to stamp and evaluate expiry
    pub fn with_clock<D>(self, clock: D) -> FileStorage<D> {
        FileStorage {
            path: self.path,
            write_guard: self.write_guard,
            clock,
        }
    }

    async fn load(&self) -> Result<Document, io::Error> {
        let mut file = match OpenOptions::new().read(true).open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(error) => return Err(error),
        };

        let mut data = String::new();
        file.read_to_string(&mut data).await?;
        if data.is_empty() {
            return Ok(Document::new());
        }

        let document = serde_json::from_str(&data)?;
        Ok(document)
    }

    async fn persist(&self, document: &Document) -> Result<(), io::Error> {
        let mut file_opts = OpenOptions::new();
        file_opts.create(true).truncate(true).write(true);
        #[cfg(unix)]
        file_opts.mode(0o600);

        let mut file = file_opts.open(&self.path).await?;
        let data = serde_json::to_string_pretty(document)?;
        file.write_all(data.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl<C> AsyncCredentialStorage for FileStorage<C>
where
    C: Clock + Send + Sync,
{
    async fn store(
        &self,
        key: &str,
        value: &str,
        ttl: DurationSecs,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
        let _guard = self.write_guard.lock().await;

        let mut document = match self.load().await {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "unable to load credential file, starting a fresh document"
                );
                Document::new()
            }
        };

        document.insert(
            key.to_owned(),
            StoredEntry {
                value: value.to_owned(),
                expires_at: self.clock.now() + ttl,
            },
        );

        self.persist(&document).await?;
        Ok(())
    }

    async fn read(
        &self,
        key: &str,
    ) -> Result<Option<String>, Box<dyn error::Error + Send + Sync + 'static>> {
        let document = self.load().await?;
        let value = document
            .get(key)
            .filter(|entry| self.clock.now() < entry.expires_at)
            .map(|entry| entry.value.clone());
        Ok(value)
    }

    async fn remove(
        &self,
        key: &str,
    ) -> Result<(), Box<dyn error::Error + Send + Sync + 'static>> {
        let _guard = self.write_guard.lock().await;

        let mut document = match self.load().await {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "unable to load credential file, clearing it"
                );
                self.persist(&Document::new()).await?;
                return Ok(());
            }
        };

        if document.remove(key).is_some() {
            self.persist(&document).await?;
        }
        Ok(())
    }
}
