use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::session::Session;
use crate::store::vector::VectorStore;

/// Shared application state.
///
/// Sessions sit behind a tokio mutex each: one turn per session runs to
/// completion before the next starts, while turns from different sessions
/// proceed independently.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub vectors: Arc<VectorStore>,
    pub http_client: reqwest::Client,
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(config.vector_dir())?;

        let vectors = VectorStore::open_or_create(&config.vector_dir())?;
        let max_concurrent_chats = config.max_concurrent_chats;

        Ok(Self {
            config,
            vectors: Arc::new(vectors),
            http_client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent_chats)),
        })
    }

    /// Fetch an existing session, or mint a new one when `id` is absent or
    /// stale. Returns the effective id alongside the handle.
    pub fn get_or_create_session(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<Session>>) {
        if let Some(id) = id {
            if let Some(session) = self.sessions.read().get(&id) {
                return (id, session.clone());
            }
        }
        let session = Session::new();
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().insert(id, handle.clone());
        tracing::info!("created session {id}");
        (id, handle)
    }

    pub fn get_session(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Tear a session down entirely, discarding its export table.
    pub fn remove_session(&self, id: Uuid) -> bool {
        self.sessions.write().remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        (AppState::new(config).unwrap(), dir)
    }

    #[test]
    fn test_missing_id_mints_session() {
        let (state, _dir) = state();
        let (id, _) = state.get_or_create_session(None);
        assert!(state.get_session(id).is_some());
    }

    #[test]
    fn test_stale_id_mints_fresh_session() {
        let (state, _dir) = state();
        let stale = Uuid::new_v4();
        let (id, _) = state.get_or_create_session(Some(stale));
        assert_ne!(id, stale);
    }

    #[test]
    fn test_existing_id_reused() {
        let (state, _dir) = state();
        let (id, _) = state.get_or_create_session(None);
        let (again, _) = state.get_or_create_session(Some(id));
        assert_eq!(id, again);
    }

    #[test]
    fn test_remove_session() {
        let (state, _dir) = state();
        let (id, _) = state.get_or_create_session(None);
        assert!(state.remove_session(id));
        assert!(state.get_session(id).is_none());
        assert!(!state.remove_session(id));
    }
}
