//! Fuzz target: HM3301 frame validation and decoding
//!
//! Feeds arbitrary 29-byte frames through `check_frame` and `decode` and
//! asserts that an accepted frame always carries a matching checksum and
//! at least one non-zero byte.
//!
//! cargo fuzz run fuzz_hm3301_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use pmlogger::app::ports::RAW_FRAME_LEN;
use pmlogger::sensors::hm3301::{check_frame, decode, frame_checksum};

fuzz_target!(|data: &[u8]| {
    let Some(bytes) = data.get(..RAW_FRAME_LEN) else {
        return;
    };
    let mut frame = [0u8; RAW_FRAME_LEN];
    frame.copy_from_slice(bytes);

    if check_frame(&frame).is_ok() {
        assert_eq!(frame_checksum(&frame), frame[RAW_FRAME_LEN - 1]);
        assert!(frame.iter().any(|b| *b != 0), "all-zero frame accepted");
    }

    let reading = decode(&frame);
    assert_eq!(reading.pm2_5, u16::from_be_bytes([frame[6], frame[7]]));
});
