//! Shared services handed to every connection task.
//!
//! Everything a command handler might need lives here, each piece behind
//! its own lock. Tests build a fresh context per case, so nothing is
//! global.

use std::sync::Arc;

use a3zone_protocol::JsonCodec;
use a3zone_rules::Character;
use a3zone_session::{AuthAttemptLimiter, Session, SessionRegistry, TokenVerifier, Visibility};
use a3zone_social::{GuildRegistry, PartyRegistry};
use a3zone_store::CharacterStore;
use a3zone_world::{MobTable, WorldDirectory};
use tracing::{debug, error, info};

use crate::config::ZoneConfig;

pub(crate) struct ZoneContext {
    pub(crate) config: ZoneConfig,
    pub(crate) codec: JsonCodec,
    pub(crate) verifier: TokenVerifier,
    pub(crate) limiter: AuthAttemptLimiter,
    pub(crate) registry: SessionRegistry,
    pub(crate) visibility: Visibility,
    pub(crate) mobs: Arc<MobTable>,
    pub(crate) worlds: WorldDirectory,
    pub(crate) parties: PartyRegistry,
    pub(crate) guilds: GuildRegistry,
    pub(crate) store: Arc<CharacterStore>,
}

impl ZoneContext {
    pub(crate) fn new(config: ZoneConfig) -> Self {
        let mode = config.persistence();
        info!(
            mode = %mode,
            data_dir = %config.data_dir.display(),
            "character persistence ready"
        );

        Self {
            codec: JsonCodec,
            verifier: TokenVerifier::new(config.auth_secret.as_bytes()),
            limiter: AuthAttemptLimiter::new(config.limits.auth_limiter()),
            registry: SessionRegistry::new(),
            visibility: Visibility::new(),
            mobs: Arc::new(MobTable::from_catalog()),
            worlds: WorldDirectory::new(),
            parties: PartyRegistry::new(),
            guilds: GuildRegistry::new(),
            store: Arc::new(CharacterStore::new(mode, &config.data_dir)),
            config,
        }
    }

    /// Authenticated sessions currently connected.
    pub(crate) fn online(&self) -> usize {
        let mut count = 0;
        self.registry.for_each(|s| {
            if s.is_authenticated() {
                count += 1;
            }
        });
        count
    }

    /// Writes the session's character and waits for the write to finish.
    /// Failures are logged; memory is never rolled back.
    pub(crate) async fn persist(&self, session: &Session) {
        if let Some(c) = saveable(session) {
            save(Arc::clone(&self.store), c).await;
        }
    }

    /// Like [`persist`](Self::persist) but on a detached task, for
    /// sessions other than the caller's and for the disconnect path.
    pub(crate) fn persist_detached(&self, session: &Session) {
        if let Some(c) = saveable(session) {
            tokio::spawn(save(Arc::clone(&self.store), c));
        }
    }
}

fn saveable(session: &Session) -> Option<Character> {
    let state = session.lock();
    state.authenticated.then(|| state.character.clone())
}

async fn save(store: Arc<CharacterStore>, c: Character) {
    let name = c.name.clone();
    match tokio::task::spawn_blocking(move || store.save(&c)).await {
        Ok(Ok(())) => debug!(character = %name, "character saved"),
        Ok(Err(e)) => error!(character = %name, error = %e, "character save failed"),
        Err(e) => error!(character = %name, error = %e, "character save task failed"),
    }
}
