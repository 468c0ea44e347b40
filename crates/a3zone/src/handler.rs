//! Per-connection handler: greeting, auth deadline, rate limiting and
//! command routing.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], plus a writer task that drains the session's
//! outbound channel onto the socket. The flow is:
//!   1. Register a guest session and send `AUTH_REQUIRED`
//!   2. Read frames; while unauthenticated each read has a deadline
//!   3. Rate-limit, gate on auth, decode and dispatch each command
//!   4. Persist after commands that changed the character
//!   5. On exit the [`SessionGuard`] tears the session down

use std::sync::Arc;
use std::time::{Duration, Instant};

use a3zone_protocol::{
    ClientCommand, Codec, Envelope, JsonCodec, ProtocolError, ServerMessage, WorldId, reply,
};
use a3zone_rules::{Character, Class, catalog};
use a3zone_session::{CommandWindow, Session, SessionId};
use a3zone_transport::Connection;
use tokio::sync::mpsc;

use crate::ZoneError;
use crate::context::ZoneContext;
use crate::dispatch::{self, Effect, announce_departure};

/// How long the writer gets to flush queued replies after the read loop
/// ends.
const WRITER_DRAIN: Duration = Duration::from_secs(2);

const LOGIN_REQUIRED: &str = "LOGIN_REQUIRED";
const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";

/// Drop guard that tears the session down when the handler exits, even
/// on an early `?` return.
struct SessionGuard {
    session: Arc<Session>,
    ctx: Arc<ZoneContext>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        disconnect(&self.ctx, &self.session);
    }
}

/// Removes a session from every shared table and saves its character.
///
/// Peers still paired with it get `PLAYER_LEFT`; party members get
/// `MEMBER_DISCONNECTED`.
fn disconnect(ctx: &ZoneContext, session: &Session) {
    if let Some(me) = session.presence() {
        ctx.visibility.remove(session, &me.name, &ctx.registry.snapshot());
        if let Some(leave) = ctx.parties.disconnect(&me.name) {
            announce_departure(ctx, "MEMBER_DISCONNECTED", &me.name, &leave);
        }
        ctx.persist_detached(session);
        ctx.registry.unbind(session.id(), &me.name);
        tracing::info!(session = %session.id(), character = %me.name, "player disconnected");
    }
    ctx.registry.remove(session.id());
}

/// Drains `rx` onto the connection until every sender is gone or a
/// write fails.
async fn write_outbound<C: Connection>(
    conn: Arc<C>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    codec: JsonCodec,
) {
    while let Some(msg) = rx.recv().await {
        let bytes = match codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(conn_id = %conn.id(), error = %e, "failed to encode reply");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed, stopping writer");
            break;
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    ctx: Arc<ZoneContext>,
) -> Result<(), ZoneError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_outbound(Arc::clone(&conn), rx, ctx.codec));

    let id = conn_id.into_inner();
    let session = Arc::new(Session::new(
        SessionId(id),
        peer,
        tx,
        Character::new(format!("Guest_{id}"), Class::default()),
        catalog::spawn_point(WorldId::KNOWN),
    ));
    ctx.registry.add(Arc::clone(&session));
    let guard = SessionGuard {
        session: Arc::clone(&session),
        ctx: Arc::clone(&ctx),
    };

    let result = read_loop(&*conn, &ctx, &session).await;

    drop(guard);
    drop(session);
    if tokio::time::timeout(WRITER_DRAIN, writer).await.is_err() {
        tracing::debug!(%conn_id, "writer still busy at close");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    result
}

async fn read_loop<C: Connection>(
    conn: &C,
    ctx: &Arc<ZoneContext>,
    session: &Arc<Session>,
) -> Result<(), ZoneError> {
    let conn_id = conn.id();
    let limits = &ctx.config.limits;
    let mut window = CommandWindow::default();

    session.send(ServerMessage::text(reply::AUTH_REQUIRED, LOGIN_REQUIRED))?;

    loop {
        let authenticated = session.is_authenticated();
        let read = if authenticated {
            Ok(conn.recv().await)
        } else {
            tokio::time::timeout(limits.auth_timeout(), conn.recv()).await
        };
        let data = match read {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "no authentication before deadline, closing");
                break;
            }
        };

        let envelope: Envelope = match ctx.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        if !window.allow(Instant::now(), limits.command_limit(authenticated)) {
            session.send(ServerMessage::text(reply::RATE_LIMITED, TOO_MANY_REQUESTS))?;
            continue;
        }
        if !authenticated && !envelope.command.trim().eq_ignore_ascii_case("AUTH_TOKEN") {
            session.send(ServerMessage::text(reply::AUTH_REQUIRED, LOGIN_REQUIRED))?;
            continue;
        }

        let cmd = match ClientCommand::from_envelope(envelope) {
            Ok(cmd) => cmd,
            Err(ProtocolError::UnknownCommand(name)) => {
                tracing::debug!(%conn_id, command = %name, "unknown command");
                session.send(ServerMessage::text(reply::ERROR, UNKNOWN_COMMAND))?;
                continue;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "bad command payload");
                continue;
            }
        };

        match dispatch::dispatch(ctx, session, cmd).await? {
            Effect::Done => {}
            Effect::Changed => ctx.persist(session).await,
            Effect::Close => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{self, drain, find};
    use a3zone_protocol::Position;

    // =====================================================================
    // disconnect
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_notifies_visible_peer() {
        let (ctx, _dir) = testing::context();
        let spawn = catalog::spawn_point(WorldId::KNOWN);
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", spawn);
        let (peer, mut peer_rx) = testing::player(&ctx, 2, "Bram", spawn);
        ctx.visibility.refresh(&session, &ctx.registry.snapshot());
        drain(&mut peer_rx);

        disconnect(&ctx, &session);

        assert_eq!(drain(&mut peer_rx), [ServerMessage::text(reply::PLAYER_LEFT, "Ayla")]);
        assert!(ctx.registry.find("Ayla").is_none());
        assert!(ctx.registry.get(session.id()).is_none());
        assert!(!ctx.visibility.is_paired(session.id(), peer.id()));
    }

    #[tokio::test]
    async fn test_disconnect_party_members_told() {
        let (ctx, _dir) = testing::context();
        let far = Position::new(400.0, 0.0, 400.0);
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", far);
        let (_bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", catalog::spawn_point(WorldId::KNOWN));
        let (_cato, mut cato_rx) = testing::player(&ctx, 3, "Cato", catalog::spawn_point(WorldId::KNOWN));
        ctx.parties.invite("Ayla", "Bram").unwrap();
        ctx.parties.accept("Bram", None).unwrap();
        ctx.parties.invite("Ayla", "Cato").unwrap();
        ctx.parties.accept("Cato", None).unwrap();

        disconnect(&ctx, &session);

        for rx in [&mut bram_rx, &mut cato_rx] {
            let update = find(&drain(rx), reply::PARTY_UPDATE).unwrap();
            assert_eq!(update.payload["reason"], "MEMBER_DISCONNECTED");
            assert_eq!(update.payload["member"], "Ayla");
            assert_eq!(update.payload["dissolved"], false);
        }
        assert_eq!(ctx.parties.members_of("Bram"), ["Cato"]);
    }

    #[tokio::test]
    async fn test_disconnect_guest_only_removed() {
        let (ctx, _dir) = testing::context();
        let (guest, _rx) = testing::guest(&ctx, 7);

        disconnect(&ctx, &guest);

        assert!(ctx.registry.is_empty());
    }

    // =====================================================================
    // duplicate login
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_of_replaced_session_keeps_newer_save() {
        use a3zone_protocol::AuthTokenArgs;
        use a3zone_session::Claims;

        let (ctx, _dir) = testing::context();
        let now = chrono::Utc::now().timestamp();
        let login = |name: &str| {
            ClientCommand::AuthToken(AuthTokenArgs {
                token: ctx.verifier.sign(&Claims::new(name, now, 3600)).unwrap(),
                class: None,
            })
        };
        let (old, _old_rx) = testing::guest(&ctx, 1);
        dispatch::dispatch(&ctx, &old, login("Ayla")).await.unwrap();
        let (newer, _rx) = testing::guest(&ctx, 2);
        dispatch::dispatch(&ctx, &newer, login("Ayla")).await.unwrap();

        newer.lock().character.xp = 999;
        ctx.persist(&newer).await;
        old.lock().character.xp = 1;
        ctx.persist(&old).await;
        disconnect(&ctx, &old);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(ctx.store.load("Ayla", None).unwrap().xp, 999);
        assert_eq!(ctx.registry.find("Ayla").map(|s| s.id()), Some(newer.id()));
        assert!(ctx.registry.get(old.id()).is_none());
    }
}
