//! Unit tests for the signal cooldown state machine

use chrono::{DateTime, Duration, TimeZone, Utc};
use signalgen::signals::{Lifecycle, SignalStateMachine};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

#[test]
fn starts_idle_and_fires_once() {
    let mut sm = SignalStateMachine::new();
    assert_eq!(sm.lifecycle(), Lifecycle::Idle);
    assert!(sm.fire(t0()));
    assert_eq!(sm.lifecycle(), Lifecycle::Cooldown);
    assert!(!sm.fire(t0() + Duration::seconds(1)));
    assert_eq!(sm.last_signal_time(), Some(t0()));
}

#[test]
fn cooldown_expiry_is_strict() {
    let cooldown = Duration::seconds(60);
    let mut sm = SignalStateMachine::new();
    sm.fire(t0());

    assert_eq!(sm.poll(t0() + Duration::seconds(59), cooldown), Lifecycle::Cooldown);
    assert_eq!(sm.poll(t0() + cooldown, cooldown), Lifecycle::Cooldown);
    assert_eq!(
        sm.poll(t0() + cooldown + Duration::milliseconds(1), cooldown),
        Lifecycle::Idle
    );
    assert!(sm.fire(t0() + Duration::seconds(61)));
}

#[test]
fn remaining_cooldown() {
    let cooldown = Duration::seconds(60);
    let mut sm = SignalStateMachine::new();
    assert_eq!(sm.remaining_cooldown(t0(), cooldown), None);

    sm.fire(t0());
    assert_eq!(
        sm.remaining_cooldown(t0() + Duration::seconds(20), cooldown),
        Some(Duration::seconds(40))
    );
    assert_eq!(sm.remaining_cooldown(t0() + Duration::seconds(90), cooldown), None);
}

#[test]
fn reset_returns_to_idle() {
    let mut sm = SignalStateMachine::new();
    sm.fire(t0());
    sm.reset();
    assert_eq!(sm.lifecycle(), Lifecycle::Idle);
    assert_eq!(sm.last_signal_time(), None);
}
