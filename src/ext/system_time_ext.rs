use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Timestamp layout of every journal line, e.g. `2024-05-01 13:37:00`.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait SystemTimeExt {
    /// Formats the instant in local time using [`LOG_TIMESTAMP_FORMAT`].
    fn to_log_timestamp(&self) -> String;
}

impl SystemTimeExt for SystemTime {
    fn to_log_timestamp(&self) -> String {
        DateTime::<Local>::from(*self)
            .format(LOG_TIMESTAMP_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn log_timestamp_has_date_and_time_fields() {
        let stamp = (SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)).to_log_timestamp();

        assert_eq!(stamp.len(), "YYYY-MM-DD HH:MM:SS".len());
        let bytes = stamp.as_bytes();
        assert_eq!(bytes[4], b'-');
        assert_eq!(bytes[7], b'-');
        assert_eq!(bytes[10], b' ');
        assert_eq!(bytes[13], b':');
        assert_eq!(bytes[16], b':');
        assert!(stamp.starts_with("2023-11-1"));
    }
}
