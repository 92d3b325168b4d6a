use std::sync::Arc;

use crate::{session::SessionKeys, store::FoodStore};

/// Shared by every handler. The store is opened by the entry point and
/// injected here; nothing reaches for a global client.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FoodStore>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn FoodStore>, sessions: SessionKeys) -> Self {
        Self {
            store,
            sessions: Arc::new(sessions),
        }
    }
}
