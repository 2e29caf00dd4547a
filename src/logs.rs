//! External log archival collaborator
//!
//! After a game ends its server logs are pushed to an external archive.
//! Upload failures are logged and never block or reverse the ended
//! transition.

use crate::error::Result;
use crate::games::instance::Game;
use async_trait::async_trait;
use tracing::info;

/// Uploads a finished game's logs, returning the archive URL
#[async_trait]
pub trait LogUploader: Send + Sync {
    async fn upload(&self, game: &Game) -> Result<String>;
}

/// Uploader that archives nothing; returns a placeholder URL
#[derive(Debug, Default)]
pub struct NoopLogUploader;

#[async_trait]
impl LogUploader for NoopLogUploader {
    async fn upload(&self, game: &Game) -> Result<String> {
        info!(game_id = %game.id, "no log archive configured, skipping upload");
        Ok(format!("file:///dev/null#{}", game.log_secret))
    }
}
