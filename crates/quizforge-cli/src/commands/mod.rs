pub mod attempts;
pub mod import;
pub mod init;
pub mod list;
pub mod show;
pub mod take;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use quizforge_store::{MemoryStore, QuizforgeConfig};

/// Loaded configuration plus the store it points at.
pub struct Workspace {
    pub config: QuizforgeConfig,
    pub store: Arc<MemoryStore>,
}

impl Workspace {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = quizforge_store::config::load_config_from(config_path)?;
        let store = Arc::new(quizforge_store::open_store(&config)?);
        Ok(Self { config, store })
    }

    /// Write the store back to its snapshot file.
    pub async fn persist(&self) -> Result<()> {
        self.store.save_snapshot(&self.config.store_path).await
    }
}
