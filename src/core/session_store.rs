use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use mockall::automock;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};


/// Fixed key of the session handoff between the start and status screens
pub const SESSION_STORAGE_KEY: &str = "stripe_verification_session";

/// Mailbox carrying the session identifier across the provider redirect.
///
/// Written once by the start screen, read then cleared by the status screen.
#[automock]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store(&self, session_id: String)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    async fn get(&self) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
    async fn remove(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct FileSystemSessionStore {
    path: PathBuf,
}

impl FileSystemSessionStore {
    pub fn new(data_dir: &str) -> Self {
        Self {
            path: Path::new(data_dir).join(SESSION_STORAGE_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSystemSessionStore {
    async fn store(
        &self,
        session_id: String,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!("storing session identifier in {}", self.path.display());

        let mut file = File::create(&self.path).await?;

        if let Err(e) = file.write_all(session_id.as_bytes()).await {
            file.shutdown().await?;
            return Err(Box::new(e));
        }

        file.shutdown().await?;

        Ok(())
    }

    async fn get(&self) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let mut file = File::open(&self.path).await?;
        let mut buffer = vec![];

        file.read_to_end(&mut buffer).await?;

        let session_id = String::from_utf8(buffer)?;
        let session_id = session_id.trim();

        if session_id.is_empty() {
            warn!("ignoring empty session file {}", self.path.display());
            return Ok(None);
        }

        Ok(Some(session_id.to_string()))
    }

    async fn remove(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match fs::remove_file(&self.path).await {
            Ok(_) => {
                debug!("cleared stored session identifier");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Box::new(e)),
        }
    }
}
