//! Logging gate: every combination of mount, sync and clock state.

use pmlogger::app::gate::{LogSkip, try_log};
use pmlogger::app::ports::Reading;

use crate::mock_hw::{FixedClock, MemoryStorage, march_first};

const READING: Reading = Reading {
    pm1_0: 12,
    pm2_5: 34,
    pm10: 56,
};

fn storage(mounted: bool) -> MemoryStorage {
    if mounted {
        MemoryStorage::mounted()
    } else {
        MemoryStorage::unmountable()
    }
}

fn clock(plausible: bool) -> FixedClock {
    if plausible {
        march_first()
    } else {
        FixedClock::at(1970, 1, 1, 0, 0, 5)
    }
}

#[test]
fn only_mounted_synced_plausible_writes() {
    for mounted in [false, true] {
        for synced in [false, true] {
            for plausible in [false, true] {
                let mut disk = storage(mounted);
                let result = try_log(&mut disk, &clock(plausible), synced, READING);
                let should_write = mounted && synced && plausible;
                assert_eq!(
                    result.is_ok(),
                    should_write,
                    "mounted={mounted} synced={synced} plausible={plausible}"
                );
                assert_eq!(disk.line_count(), usize::from(should_write));
            }
        }
    }
}

#[test]
fn skip_reasons_follow_check_order() {
    let mut unmounted = storage(false);
    assert_eq!(
        try_log(&mut unmounted, &clock(false), false, READING),
        Err(LogSkip::NotMounted)
    );

    let mut disk = storage(true);
    assert_eq!(
        try_log(&mut disk, &clock(false), false, READING),
        Err(LogSkip::Unsynchronized)
    );
    assert_eq!(
        try_log(&mut disk, &clock(false), true, READING),
        Err(LogSkip::ImplausibleYear(1970))
    );
}

#[test]
fn unset_clock_is_reported() {
    let mut disk = storage(true);
    let err = try_log(&mut disk, &FixedClock::unset(), true, READING).unwrap_err();
    assert!(matches!(err, LogSkip::ClockUnavailable(_)));
    assert_eq!(disk.line_count(), 0);
}

#[test]
fn records_append_to_the_day_file() {
    let mut disk = storage(true);
    let first = try_log(&mut disk, &march_first(), true, READING).unwrap();
    assert_eq!(first.partition.as_str(), "2025-03-01");
    assert_eq!(first.timestamp.as_str(), "2025-03-01T10:15:30");

    try_log(&mut disk, &FixedClock::at(2025, 3, 1, 23, 59, 59), true, READING).unwrap();
    try_log(&mut disk, &FixedClock::at(2025, 3, 2, 0, 0, 0), true, READING).unwrap();

    assert_eq!(
        disk.files["2025-03-01.txt"],
        "2025-03-01T10:15:30,PM1_0:12,PM2_5:34,PM10:56\n\
         2025-03-01T23:59:59,PM1_0:12,PM2_5:34,PM10:56\n"
    );
    assert_eq!(
        disk.files["2025-03-02.txt"],
        "2025-03-02T00:00:00,PM1_0:12,PM2_5:34,PM10:56\n"
    );
}
