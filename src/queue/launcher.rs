//! Glue between the queue and the game lifecycle
//!
//! When the queue reaches the launching state, the launcher resolves the
//! marked friendships against the final roster, picks a map, creates the
//! game, and resets the queue for the next round.

use crate::events::messages::Event;
use crate::events::{EventBus, Topic};
use crate::games::GameManager;
use crate::maps::MapPicker;
use crate::queue::friends::{resolve, FriendshipRegistry};
use crate::queue::QueueEngine;
use crate::types::QueueState;
use std::sync::Arc;
use tracing::{error, info};

/// Launches a game whenever the queue fills and readies up
#[derive(Clone)]
pub struct AutoLauncher {
    queue: QueueEngine,
    games: GameManager,
    friends: Arc<FriendshipRegistry>,
    maps: Arc<dyn MapPicker>,
}

impl AutoLauncher {
    pub fn new(
        queue: QueueEngine,
        games: GameManager,
        friends: Arc<FriendshipRegistry>,
        maps: Arc<dyn MapPicker>,
    ) -> Self {
        Self {
            queue,
            games,
            friends,
            maps,
        }
    }

    /// Subscribe to queue state changes on the bus
    pub fn wire(&self, bus: &EventBus) {
        let launcher = self.clone();
        bus.subscribe(Topic::QueueStateChanged, move |event| {
            if let Event::QueueStateChanged(changed) = event {
                if changed.state == QueueState::Launching {
                    launcher.launch();
                }
            }
            Ok(())
        });
    }

    /// Take the launching roster, create the game, reset the queue.
    ///
    /// The queue is reset even when game creation fails, so a transient
    /// failure never wedges the queue in the launching state.
    fn launch(&self) {
        let slots = self.queue.slots();
        let friendships = resolve(&self.friends.proposals(), &slots);
        let map = self.maps.pick();

        match self.games.create(&slots, map, &friendships) {
            Ok(game) => {
                info!(
                    game_id = %game.id,
                    game_number = game.number,
                    map = %game.map,
                    "queue launched a game"
                );
            }
            Err(e) => {
                error!(error = %e, "game creation failed, resetting the queue anyway");
            }
        }

        self.friends.clear();
        self.queue.reset();
    }
}
