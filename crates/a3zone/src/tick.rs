//! Housekeeping on the zone clock.

use std::sync::Arc;
use std::time::Instant;

use a3zone_tick::{ClockConfig, ZoneClock};
use tokio::sync::watch;

use crate::context::ZoneContext;

/// Ticks until `shutdown` flips or its sender goes away.
pub(crate) async fn run(ctx: Arc<ZoneContext>, mut shutdown: watch::Receiver<bool>) {
    let mut clock = ZoneClock::new(ClockConfig::every(ctx.config.tick_interval()));

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            beat = clock.next_beat() => {
                chores(&ctx, beat.number);
                clock.finish_beat();
            }
        }
    }
    tracing::debug!(beats = clock.beats(), "zone clock stopped");
}

fn chores(ctx: &ZoneContext, beat: u64) {
    let pruned = ctx.limiter.prune(Instant::now());
    tracing::debug!(
        beat,
        online = ctx.online(),
        connections = ctx.registry.len(),
        limiter_peers = ctx.limiter.tracked_peers(),
        pruned,
        "zone heartbeat"
    );
}
