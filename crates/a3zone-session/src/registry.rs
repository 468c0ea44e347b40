//! Every live session, plus a character-name index.
//!
//! The registry holds `Arc<Session>`s behind one `RwLock`. Lookups and
//! traversals take the read side; add, remove and name binding take the
//! write side. Callbacks passed to [`SessionRegistry::for_each`] run under
//! the read lock, so they must only push to outbound channels and never
//! call back into the registry.
//!
//! Never call into the registry while holding a session's state lock.
//! The order is always registry first, then session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Session, SessionId};

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, Arc<Session>>,
    by_name: HashMap<String, SessionId>,
    /// Reverse of `by_name`: the name each session is bound under.
    bound: HashMap<SessionId, String>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, session: Arc<Session>) {
        self.inner.write().sessions.insert(session.id(), session);
    }

    /// Removes a session and, if it still owns it, its name binding.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if let Some(name) = inner.bound.remove(&id) {
            if inner.by_name.get(&name) == Some(&id) {
                inner.by_name.remove(&name);
            }
        }
        inner.sessions.remove(&id)
    }

    /// Binds `name` to session `id`, dropping whatever name the session
    /// had before.
    ///
    /// If another session was bound under `name` it loses the binding and
    /// its id is returned. The newest login owns the name.
    pub fn rebind(&self, id: SessionId, name: &str) -> Option<SessionId> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if let Some(old) = inner.bound.remove(&id) {
            if inner.by_name.get(&old) == Some(&id) {
                inner.by_name.remove(&old);
            }
        }
        let displaced = inner
            .by_name
            .insert(name.to_string(), id)
            .filter(|prev| *prev != id);
        if let Some(prev) = displaced {
            inner.bound.remove(&prev);
            tracing::info!(character = %name, from = %prev, to = %id, "name rebound to newer session");
        }
        inner.bound.insert(id, name.to_string());
        displaced
    }

    /// Removes the binding of `name` only if it still points at `id`.
    pub fn unbind(&self, id: SessionId, name: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.by_name.get(name) != Some(&id) {
            return false;
        }
        inner.by_name.remove(name);
        inner.bound.remove(&id);
        true
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.inner.read().sessions.get(&id).cloned()
    }

    /// The session currently bound under `name`.
    pub fn find(&self, name: &str) -> Option<Arc<Session>> {
        let inner = self.inner.read();
        let id = inner.by_name.get(name)?;
        inner.sessions.get(id).cloned()
    }

    /// Calls `f` for every session under the read lock.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<Session>)) {
        for session in self.inner.read().sessions.values() {
            f(session);
        }
    }

    /// A point-in-time copy of every session, sorted by id.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        let mut all: Vec<_> = self.inner.read().sessions.values().cloned().collect();
        all.sort_by_key(|s| s.id());
        all
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}
