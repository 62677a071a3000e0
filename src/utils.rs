use std::time::Duration;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + u64::from(duration.subsec_nanos() / 1_000_000)
}
