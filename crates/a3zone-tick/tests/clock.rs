//! Zone clock tests on paused tokio time: sleeps resolve as soon as the
//! runtime is idle.

use std::time::Duration;

use a3zone_tick::{ClockConfig, ZoneClock};

fn clock_ms(ms: u64) -> ZoneClock {
    ZoneClock::new(ClockConfig::every(Duration::from_millis(ms)))
}

// =========================================================================
// ClockConfig
// =========================================================================

#[test]
fn test_clock_config_default_beats_every_second() {
    let cfg = ClockConfig::default();
    assert_eq!(cfg.interval, Duration::from_secs(1));
    assert_eq!(cfg.work_budget, ClockConfig::DEFAULT_WORK_BUDGET);
}

#[test]
fn test_validated_zero_interval_falls_back() {
    let cfg = ClockConfig::every(Duration::ZERO).validated();
    assert_eq!(cfg.interval, ClockConfig::DEFAULT_INTERVAL);
}

#[test]
fn test_validated_budget_clamped_and_nan_reset() {
    let high = ClockConfig {
        work_budget: 4.0,
        ..ClockConfig::default()
    }
    .validated();
    let nan = ClockConfig {
        work_budget: f64::NAN,
        ..ClockConfig::default()
    }
    .validated();

    assert_eq!(high.work_budget, 1.0);
    assert_eq!(nan.work_budget, ClockConfig::DEFAULT_WORK_BUDGET);
}

// =========================================================================
// next_beat
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_next_beat_first_after_one_interval() {
    let mut clock = clock_ms(250);
    let start = tokio::time::Instant::now();

    let beat = clock.next_beat().await;

    assert_eq!(beat.number, 1);
    assert!(!beat.late);
    assert_eq!(beat.skipped, 0);
    assert_eq!(start.elapsed(), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_next_beat_numbers_count_up() {
    let mut clock = clock_ms(100);
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(clock.next_beat().await.number);
    }
    assert_eq!(seen, [1, 2, 3, 4]);
    assert_eq!(clock.beats(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_next_beat_after_stall_skips_without_burst() {
    let mut clock = clock_ms(100);
    clock.next_beat().await;

    tokio::time::advance(Duration::from_millis(350)).await;
    let late = clock.next_beat().await;

    assert!(late.late);
    assert_eq!(late.skipped, 2);
    let stats = clock.stats();
    assert_eq!(stats.late_beats, 1);
    assert_eq!(stats.skipped, 2);

    let before = tokio::time::Instant::now();
    let on_time = clock.next_beat().await;
    assert!(!on_time.late);
    assert_eq!(before.elapsed(), Duration::from_millis(100));
}

// =========================================================================
// finish_beat
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_finish_beat_without_open_beat_is_noop() {
    let mut clock = clock_ms(100);
    clock.finish_beat();
    assert_eq!(clock.stats().last_load, 0.0);
    assert_eq!(clock.stats().slowest_work, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_finish_beat_measures_wall_clock_work() {
    let mut clock = clock_ms(1000);
    clock.next_beat().await;
    std::thread::sleep(Duration::from_micros(300));
    clock.finish_beat();

    let stats = clock.stats();
    assert!(stats.slowest_work >= Duration::from_micros(300));
    assert!(stats.last_load > 0.0 && stats.last_load < 1.0);
}

// =========================================================================
// Shutdown in a select! loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_exits_when_shutdown_flips() {
    let mut clock = clock_ms(50);
    let (tx, mut rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(175)).await;
        let _ = tx.send(true);
    });

    let mut beats = 0;
    loop {
        tokio::select! {
            _ = rx.changed() => break,
            beat = clock.next_beat() => {
                beats = beat.number;
                clock.finish_beat();
            }
        }
    }
    assert_eq!(beats, 3);
}
