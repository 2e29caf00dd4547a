//! Game-server provisioning collaborator
//!
//! The lifecycle manager hands a created game to a provider and moves on;
//! provisioning failures are the provider's to report and never roll back
//! the game. Join/leave/team signals observed on the allocated server come
//! back through the manager's signal handlers.

use crate::error::Result;
use crate::games::instance::Game;
use async_trait::async_trait;
use tracing::info;

/// Stands up a server for a created game
#[async_trait]
pub trait GameServerProvider: Send + Sync {
    async fn launch(&self, game: Game) -> Result<()>;
}

/// Provider that only logs; useful for tests and local runs without a
/// server pool
#[derive(Debug, Default)]
pub struct NoopGameServerProvider;

#[async_trait]
impl GameServerProvider for NoopGameServerProvider {
    async fn launch(&self, game: Game) -> Result<()> {
        info!(
            game_id = %game.id,
            game_number = game.number,
            map = %game.map,
            "no game-server pool configured, skipping provisioning"
        );
        Ok(())
    }
}
