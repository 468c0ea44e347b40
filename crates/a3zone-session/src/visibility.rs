//! Who can see whom.
//!
//! Two authenticated players in the same world see each other when they
//! stand within [`VISIBILITY_RADIUS`] (inclusive). The engine remembers,
//! per unordered pair of sessions, whether they could see each other last
//! time it looked, and only reports *changes*:
//!
//! ```text
//!  was   now    mover gets        peer gets
//!  no    yes    PLAYER_JOINED     PLAYER_JOINED
//!  yes   no     PLAYER_LEFT       PLAYER_LEFT
//!  yes   yes    -                 PLAYER_MOVED
//!  no    no     -                 -
//! ```
//!
//! Callers pass in a snapshot of the registry and must not be holding
//! any session's state lock: the engine locks each session briefly to
//! read its presence.

use std::collections::HashSet;
use std::sync::Arc;

use a3zone_protocol::{Position, ServerMessage, reply};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{Presence, Session, SessionId};

/// Visibility radius in world units.
pub const VISIBILITY_RADIUS: f64 = 50.0;

/// `true` when `a` and `b` are within [`VISIBILITY_RADIUS`] of each other.
pub fn is_visible(a: &Position, b: &Position) -> bool {
    a.within(b, VISIBILITY_RADIUS)
}

#[derive(Serialize)]
struct PlayerAt<'a> {
    name: &'a str,
    pos: Position,
}

fn joined(p: &Presence) -> ServerMessage {
    ServerMessage::new(
        reply::PLAYER_JOINED,
        PlayerAt {
            name: &p.name,
            pos: p.position,
        },
    )
}

fn moved(p: &Presence) -> ServerMessage {
    ServerMessage::new(
        reply::PLAYER_MOVED,
        PlayerAt {
            name: &p.name,
            pos: p.position,
        },
    )
}

fn left(p: &Presence) -> ServerMessage {
    ServerMessage::text(reply::PLAYER_LEFT, &p.name)
}

fn pair(a: SessionId, b: SessionId) -> (SessionId, SessionId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Pairwise visibility flags.
#[derive(Debug, Default)]
pub struct Visibility {
    pairs: Mutex<HashSet<(SessionId, SessionId)>>,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paired(&self, a: SessionId, b: SessionId) -> bool {
        self.pairs.lock().contains(&pair(a, b))
    }

    /// Recomputes `mover`'s pair with every other authenticated session
    /// in `sessions` and sends the resulting notifications.
    ///
    /// Call after any position or world change, including world entry.
    /// Calling it without such a change re-sends `PLAYER_MOVED` to every
    /// paired peer. Does nothing while `mover` is unauthenticated.
    pub fn refresh(&self, mover: &Session, sessions: &[Arc<Session>]) {
        let Some(me) = mover.presence() else {
            return;
        };

        let peers: Vec<(&Arc<Session>, Presence)> = sessions
            .iter()
            .filter(|s| s.id() != mover.id())
            .filter_map(|s| s.presence().map(|p| (s, p)))
            .collect();

        let mut pairs = self.pairs.lock();
        for (other, them) in peers {
            let key = pair(mover.id(), other.id());
            let now = them.world == me.world && is_visible(&me.position, &them.position);
            let was = pairs.contains(&key);

            match (was, now) {
                (false, true) => {
                    pairs.insert(key);
                    let _ = other.send(joined(&me));
                    let _ = mover.send(joined(&them));
                }
                (true, false) => {
                    pairs.remove(&key);
                    let _ = other.send(left(&me));
                    let _ = mover.send(left(&them));
                }
                (true, true) => {
                    let _ = other.send(moved(&me));
                }
                (false, false) => {}
            }
        }
    }

    /// Tells every peer still paired with `leaver` that it is gone, and
    /// forgets all of its pairs.
    pub fn remove(&self, leaver: &Session, leaver_name: &str, sessions: &[Arc<Session>]) {
        let id = leaver.id();
        let mut pairs = self.pairs.lock();
        let msg = ServerMessage::text(reply::PLAYER_LEFT, leaver_name);
        for other in sessions.iter().filter(|s| s.id() != id) {
            if pairs.remove(&pair(id, other.id())) {
                let _ = other.send(msg.clone());
            }
        }
        pairs.retain(|(a, b)| *a != id && *b != id);
    }

    /// Number of visible pairs.
    pub fn len(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().is_empty()
    }
}
