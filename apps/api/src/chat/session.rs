//! Per-session state and the in-memory session store.
//!
//! Each session sits behind its own async mutex, held for the whole of a user
//! action, so actions on one session run one at a time while separate sessions
//! never block each other. The store's map lock is only held for lookups.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::documents::DocumentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Metadata about the document currently loaded into a session.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub file_name: Option<String>,
    pub kind: DocumentKind,
    pub characters: usize,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    history: Vec<Turn>,
    document_text: String,
    document: Option<DocumentSummary>,
    last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            history: Vec::new(),
            document_text: String::new(),
            document: None,
            last_active: now,
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// History is append-only.
    pub fn push_turn(&mut self, role: Role, text: impl Into<String>) {
        self.history.push(Turn {
            role,
            text: text.into(),
        });
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    pub fn document(&self) -> Option<&DocumentSummary> {
        self.document.as_ref()
    }

    /// Replaces the previous document wholesale.
    pub fn replace_document(&mut self, file_name: Option<String>, kind: DocumentKind, text: String) {
        self.document = Some(DocumentSummary {
            file_name,
            kind,
            characters: text.chars().count(),
        });
        self.document_text = text;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_active > ttl
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(Session::new(id, Utc::now())));
        self.sessions.write().await.insert(id, handle.clone());
        debug!("Session {id} created");
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!("Session {id} ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the TTL. Sessions locked by an
    /// in-flight action are kept.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !session.is_expired(now, self.ttl),
            Err(_) => true,
        });
        before - sessions.len()
    }
}

/// Periodically purges expired sessions for the life of the process.
pub fn spawn_sweeper(store: SessionStore, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired(Utc::now()).await;
            if purged > 0 {
                info!(
                    "Expired {purged} idle session(s), {} active",
                    store.len().await
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new(Uuid::new_v4(), Utc::now());
        assert!(session.history().is_empty());
        assert_eq!(session.document_text(), "");
        assert!(session.document().is_none());
    }

    #[test]
    fn test_history_keeps_order() {
        let mut session = Session::new(Uuid::new_v4(), Utc::now());
        session.push_turn(Role::User, "first");
        session.push_turn(Role::Ai, "second");
        session.push_turn(Role::User, "third");
        let texts: Vec<_> = session.history().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(session.history()[1].role, Role::Ai);
    }

    #[test]
    fn test_upload_replaces_previous_document() {
        let mut session = Session::new(Uuid::new_v4(), Utc::now());
        session.replace_document(Some("old.txt".into()), DocumentKind::Text, "old".into());
        session.replace_document(Some("new.pdf".into()), DocumentKind::Pdf, "brand new".into());
        assert_eq!(session.document_text(), "brand new");
        let doc = session.document().unwrap();
        assert_eq!(doc.file_name.as_deref(), Some("new.pdf"));
        assert_eq!(doc.kind, DocumentKind::Pdf);
        assert_eq!(doc.characters, 9);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = Turn {
            role: Role::Ai,
            text: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            serde_json::json!({"role": "ai", "text": "hi"})
        );
    }

    #[test]
    fn test_expiry_is_measured_from_last_activity() {
        let start = Utc::now();
        let mut session = Session::new(Uuid::new_v4(), start);
        let ttl = Duration::seconds(60);
        assert!(!session.is_expired(start + Duration::seconds(59), ttl));
        assert!(session.is_expired(start + Duration::seconds(61), ttl));

        session.touch(start + Duration::seconds(50));
        assert!(!session.is_expired(start + Duration::seconds(100), ttl));
    }

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let store = SessionStore::new(Duration::seconds(60));
        let id = store.create().await.lock().await.id;
        assert!(store.get(id).await.is_some());
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(Duration::seconds(60));
        let a = store.create().await;
        let b = store.create().await;
        a.lock().await.push_turn(Role::User, "only in a");
        assert_eq!(a.lock().await.history().len(), 1);
        assert!(b.lock().await.history().is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_only_idle_sessions() {
        let store = SessionStore::new(Duration::seconds(60));
        let idle = store.create().await;
        let active = store.create().await;
        let later = Utc::now() + Duration::seconds(120);
        active.lock().await.touch(later);

        let purged = store.purge_expired(later + Duration::seconds(1)).await;
        assert_eq!(purged, 1);
        assert_eq!(store.len().await, 1);
        let idle_id = idle.lock().await.id;
        assert!(store.get(idle_id).await.is_none());
    }

    #[tokio::test]
    async fn test_purge_keeps_sessions_in_use() {
        let store = SessionStore::new(Duration::seconds(60));
        let busy = store.create().await;
        let _guard = busy.lock().await;

        let purged = store
            .purge_expired(Utc::now() + Duration::seconds(600))
            .await;
        assert_eq!(purged, 0);
        assert_eq!(store.len().await, 1);
    }
}
