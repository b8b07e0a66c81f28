//! Fuzz target: time-sync characteristic writes
//!
//! Any byte string a peer writes must either be rejected or yield a Unix
//! time the logging gate accepts as plausible.
//!
//! cargo fuzz run fuzz_time_sync

#![no_main]

use libfuzzer_sys::fuzz_target;
use pmlogger::adapters::time::parse_sync_payload;
use pmlogger::calendar::CalendarTime;

fuzz_target!(|data: &[u8]| {
    if let Ok(secs) = parse_sync_payload(data) {
        assert_eq!(data.len(), 4);
        assert!(CalendarTime::from_unix_secs(secs).is_plausible());
    }
});
