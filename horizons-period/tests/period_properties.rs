//! Sweeps over several years of instants and zones checking the calculus
//! invariants: every instant lies inside the period its key names, and
//! shifting forward then backward is the identity.

use chrono::{DateTime, Duration, Utc};
use horizons_period::{
    Direction, Horizon, current_period_key, local_date, parse_timezone, period_end_exclusive,
    period_key_for_date, period_start, shift_period_key,
};

const ZONES: &[&str] = &[
    "UTC",
    "America/Los_Angeles",
    "America/St_Johns",
    "Europe/London",
    "Asia/Kathmandu",
    "Pacific/Kiritimati",
    "Pacific/Pago_Pago",
];

fn instants() -> impl Iterator<Item = DateTime<Utc>> {
    let start = DateTime::parse_from_rfc3339("2024-12-20T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    // Every 7h13m over roughly three years: lands on all hours and weekdays.
    (0..3_700).map(move |i| start + Duration::minutes(433 * i))
}

#[test]
fn every_instant_lies_inside_its_period() {
    for zone in ZONES {
        let tz = parse_timezone(zone).unwrap();
        for now in instants() {
            let today = local_date(tz, now);
            for horizon in Horizon::ALL {
                let key = current_period_key(horizon, tz, now);
                let start = period_start(horizon, &key).unwrap();
                let end = period_end_exclusive(horizon, &key).unwrap();
                assert!(
                    start <= today && today < end,
                    "{zone} {now} {horizon} {key}: {start} <= {today} < {end}"
                );
            }
        }
    }
}

#[test]
fn shift_forward_then_backward_is_identity() {
    let tz = parse_timezone("UTC").unwrap();
    for now in instants() {
        for horizon in Horizon::ALL {
            let key = current_period_key(horizon, tz, now);
            let next = shift_period_key(horizon, &key, Direction::Forward).unwrap();
            let back = shift_period_key(horizon, &next, Direction::Backward).unwrap();
            assert_eq!(back, key, "{horizon}");

            let prev = shift_period_key(horizon, &key, Direction::Backward).unwrap();
            let fwd = shift_period_key(horizon, &prev, Direction::Forward).unwrap();
            assert_eq!(fwd, key, "{horizon}");
            assert!(prev < key && key < next, "{horizon}: {prev} < {key} < {next}");
        }
    }
}

#[test]
fn next_period_starts_where_current_ends() {
    let tz = parse_timezone("UTC").unwrap();
    for now in instants().step_by(11) {
        for horizon in Horizon::ALL {
            let key = current_period_key(horizon, tz, now);
            let next = shift_period_key(horizon, &key, Direction::Forward).unwrap();
            assert_eq!(
                period_start(horizon, &next).unwrap(),
                period_end_exclusive(horizon, &key).unwrap()
            );
        }
    }
}

#[test]
fn period_start_formats_back_to_the_same_key() {
    let tz = parse_timezone("Asia/Kathmandu").unwrap();
    for now in instants().step_by(5) {
        for horizon in Horizon::ALL {
            let key = current_period_key(horizon, tz, now);
            let start = period_start(horizon, &key).unwrap();
            assert_eq!(period_key_for_date(horizon, start), key);
        }
    }
}
