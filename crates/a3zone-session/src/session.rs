//! A live connection's server-side state.
//!
//! Every accepted connection gets one [`Session`], shared as
//! `Arc<Session>` between the connection's own task and anything else
//! that needs to reach it (visibility updates, PvP, party XP, chat).
//!
//! - The **outbound channel** is how anyone sends the client a message.
//!   Pushing never blocks; the connection's writer task drains it onto
//!   the socket.
//! - The **state** (character, world, position, auth flags) sits behind
//!   a mutex. Lock it, read or mutate, and let the guard drop before any
//!   `.await`.

use std::fmt;
use std::net::SocketAddr;

use a3zone_protocol::{Position, ServerMessage, WorldId};
use a3zone_rules::Character;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::SessionError;

/// Sending half of a session's outbound queue.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Identifies a session for as long as its connection is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Mutable per-connection state.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub character: Character,
    pub world: WorldId,
    pub position: Position,
    pub authenticated: bool,
    /// Consecutive failed `AUTH_TOKEN` attempts on this connection.
    pub auth_failures: u32,
}

/// Where an authenticated player is, as seen by everyone else.
#[derive(Debug, Clone, PartialEq)]
pub struct Presence {
    pub name: String,
    pub world: WorldId,
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    outbound: Outbound,
    state: Mutex<SessionState>,
}

impl Session {
    /// A fresh, unauthenticated session playing `guest` at `position`.
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        outbound: Outbound,
        guest: Character,
        position: Position,
    ) -> Self {
        let world = guest.world_id;
        Self {
            id,
            peer,
            outbound,
            state: Mutex::new(SessionState {
                character: guest,
                world,
                position,
                authenticated: false,
                auth_failures: 0,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queues `msg` for the client.
    ///
    /// # Errors
    /// [`SessionError::Closed`] once the writer task is gone. Fan-out
    /// callers usually ignore this: the disconnect path cleans up.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SessionError> {
        self.outbound.send(msg).map_err(|_| SessionError::Closed(self.id))
    }

    /// Locks the session state. Don't hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().authenticated
    }

    pub fn name(&self) -> String {
        self.state.lock().character.name.clone()
    }

    /// Name, world and position, or `None` before authentication.
    pub fn presence(&self) -> Option<Presence> {
        let state = self.state.lock();
        state.authenticated.then(|| Presence {
            name: state.character.name.clone(),
            world: state.world,
            position: state.position,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for building sessions in tests.

    use std::sync::Arc;

    use a3zone_rules::Class;

    use super::*;

    pub(crate) type Inbox = mpsc::UnboundedReceiver<ServerMessage>;

    /// An authenticated session named `name` standing at `pos` in `world`.
    pub(crate) fn player(id: u64, name: &str, world: WorldId, pos: Position) -> (Arc<Session>, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer: SocketAddr = ([127, 0, 0, 1], 40_000 + id as u16).into();
        let mut c = Character::new(name, Class::Warrior);
        c.world_id = world;
        let session = Session::new(SessionId(id), peer, tx, c, pos);
        session.lock().authenticated = true;
        (Arc::new(session), rx)
    }

    /// Every message currently queued in `inbox`.
    pub(crate) fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = inbox.try_recv() {
            out.push(msg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_presence_hidden_until_authenticated() {
        let (s, _rx) = player(1, "Ayla", WorldId::KNOWN, Position::new(1.0, 0.0, 2.0));
        s.lock().authenticated = false;
        assert_eq!(s.presence(), None);

        s.lock().authenticated = true;
        let p = s.presence().unwrap();
        assert_eq!(p.name, "Ayla");
        assert_eq!(p.world, WorldId::KNOWN);
        assert_eq!(p.position, Position::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_send_after_receiver_dropped_is_closed() {
        let (s, rx) = player(3, "Bran", WorldId::KNOWN, Position::new(0.0, 0.0, 0.0));
        s.send(ServerMessage::text("PING", "1")).unwrap();
        drop(rx);

        let err = s.send(ServerMessage::text("PING", "2")).unwrap_err();
        assert!(matches!(err, SessionError::Closed(id) if id == SessionId(3)));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(7).to_string(), "session-7");
    }
}
