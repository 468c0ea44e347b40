//! Rate limits: auth attempts per peer address, commands per session.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::SessionError;

// ---------------------------------------------------------------------------
// AuthAttemptLimiter
// ---------------------------------------------------------------------------

/// Limits for [`AuthAttemptLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthLimiterConfig {
    /// Attempts allowed per window.
    pub max_attempts: u32,
    pub window: Duration,
    /// How long a peer stays blocked after exceeding the limit.
    pub block_for: Duration,
}

impl Default for AuthLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
            block_for: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    started: Instant,
    count: u32,
    blocked_until: Option<Instant>,
}

/// Throttles `AUTH_TOKEN` attempts per peer IP.
///
/// Keyed by IP rather than socket address, so reconnecting from a new
/// port doesn't start a fresh window.
#[derive(Debug, Default)]
pub struct AuthAttemptLimiter {
    config: AuthLimiterConfig,
    peers: Mutex<HashMap<IpAddr, AttemptWindow>>,
}

impl AuthAttemptLimiter {
    pub fn new(config: AuthLimiterConfig) -> Self {
        Self {
            config,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one attempt from `peer` at `now`.
    ///
    /// # Errors
    /// [`SessionError::Throttled`] while the peer is blocked, or when this
    /// attempt is the one that goes over the limit (which starts the block).
    pub fn check(&self, peer: IpAddr, now: Instant) -> Result<(), SessionError> {
        let cfg = self.config;
        let mut peers = self.peers.lock();
        let w = peers.entry(peer).or_insert(AttemptWindow {
            started: now,
            count: 0,
            blocked_until: None,
        });

        if let Some(until) = w.blocked_until {
            if now < until {
                return Err(SessionError::Throttled {
                    retry_after: until - now,
                });
            }
            w.blocked_until = None;
        }
        if now.duration_since(w.started) > cfg.window {
            w.started = now;
            w.count = 0;
        }

        w.count += 1;
        if w.count > cfg.max_attempts {
            w.blocked_until = Some(now + cfg.block_for);
            tracing::warn!(%peer, "auth attempts exceeded, peer blocked");
            return Err(SessionError::Throttled {
                retry_after: cfg.block_for,
            });
        }
        Ok(())
    }

    /// Forgets `peer`, typically after it authenticated.
    pub fn reset(&self, peer: IpAddr) {
        self.peers.lock().remove(&peer);
    }

    /// Drops entries whose window and block have both run out. Returns
    /// how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let cfg = self.config;
        let mut peers = self.peers.lock();
        let before = peers.len();
        peers.retain(|_, w| {
            let blocked = w.blocked_until.is_some_and(|until| now < until);
            blocked || now.duration_since(w.started) <= cfg.window
        });
        before - peers.len()
    }

    pub fn tracked_peers(&self) -> usize {
        self.peers.lock().len()
    }
}

// ---------------------------------------------------------------------------
// CommandWindow
// ---------------------------------------------------------------------------

/// Fixed one-second command window, owned by a single connection task.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandWindow {
    started: Option<Instant>,
    count: u32,
}

impl CommandWindow {
    const LENGTH: Duration = Duration::from_secs(1);

    /// Counts one command at `now`; `false` when the window already
    /// holds `limit` commands.
    pub fn allow(&mut self, now: Instant, limit: u32) -> bool {
        match self.started {
            Some(start) if now.duration_since(start) < Self::LENGTH => {}
            _ => {
                self.started = Some(now);
                self.count = 0;
            }
        }
        self.count += 1;
        self.count <= limit
    }
}
