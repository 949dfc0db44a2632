use super::IdClock;

#[test]
fn it_uses_the_clock_when_it_moves_forward() {
    let mut clock = IdClock::default();
    assert_eq!(clock.next_at(1_000), 1_000);
    assert_eq!(clock.next_at(1_005), 1_005);
}

#[test]
fn it_bumps_ids_within_the_same_millisecond() {
    let mut clock = IdClock::default();
    assert_eq!(clock.next_at(1_000), 1_000);
    assert_eq!(clock.next_at(1_000), 1_001);
    assert_eq!(clock.next_at(1_000), 1_002);
    assert_eq!(clock.next_at(1_001), 1_003);
}

#[test]
fn it_never_goes_backwards_after_observing() {
    let mut clock = IdClock::new(0);
    clock.observe(5_000);
    clock.observe(4_000);
    assert_eq!(clock.last(), 5_000);
    assert_eq!(clock.next_at(1_000), 5_001);
}

#[test]
fn it_hands_out_unique_increasing_ids() {
    let mut clock = IdClock::default();
    let ids = (0..500).map(|_| return clock.next()).collect::<Vec<u64>>();

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(ids[0] >= 1_600_000_000_000);
}

#[test]
fn it_saturates_instead_of_overflowing() {
    let mut clock = IdClock::new(u64::MAX - 1);
    assert_eq!(clock.next_at(0), u64::MAX);
    assert_eq!(clock.next_at(0), u64::MAX);
}

#[test]
fn it_rejects_ids_past_the_limit() {
    assert!(IdClock::accepts(1_700_000_000_000));
    assert!(!IdClock::accepts(IdClock::LIMIT));
    assert!(!IdClock::accepts(u64::MAX));
}
