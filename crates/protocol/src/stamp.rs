//! Host clock stamping
//!
//! The device does not report wall-clock time. Before a line is parsed the
//! ingesting process appends its own local time and date as the `Time` and
//! `Date` columns. These are auxiliary metadata; ordering and indexing use
//! the parse-time clock instead.

use chrono::{DateTime, Local, TimeZone};

use crate::{DEVICE_FIELDS, FIELD_SEPARATOR, MIN_FIELDS};

/// Host time and date fields appended to a device line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStamp {
    /// `HH:MM:SS.ffffff`
    pub time: String,
    /// `DD/MM/YYYY`
    pub date: String,
}

impl HostStamp {
    /// Stamp for the current local time
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    /// Stamp for a specific instant
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time: instant.format("%H:%M:%S%.6f").to_string(),
            date: instant.format("%d/%m/%Y").to_string(),
        }
    }
}

/// Insert host time and date columns into a device line
///
/// Lines that already lack the mandatory columns are returned unchanged so
/// the parser still reports them as truncated. Shorter device lines are
/// padded with empty columns so `Time` and `Date` stay at their positions.
/// Columns past the device set are kept after the stamp.
pub fn stamp_line(line: &str, stamp: &HostStamp) -> String {
    let line = line.trim_end_matches(['\r', '\n']);
    let field_count = line.split(FIELD_SEPARATOR).count();

    if field_count < MIN_FIELDS {
        return line.to_string();
    }

    // Split at the end of the device columns
    let (device, extra) = match line.match_indices(FIELD_SEPARATOR).nth(DEVICE_FIELDS - 1) {
        Some((at, _)) => line.split_at(at),
        None => (line, ""),
    };

    let padding = DEVICE_FIELDS.saturating_sub(field_count);
    let mut stamped =
        String::with_capacity(line.len() + padding + stamp.time.len() + stamp.date.len() + 2);
    stamped.push_str(device);
    for _ in 0..padding {
        stamped.push(FIELD_SEPARATOR);
    }
    stamped.push(FIELD_SEPARATOR);
    stamped.push_str(&stamp.time);
    stamped.push(FIELD_SEPARATOR);
    stamped.push_str(&stamp.date);
    stamped.push_str(extra);
    stamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed_stamp() -> HostStamp {
        let instant = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        HostStamp::at(&instant)
    }

    #[test]
    fn test_stamp_format() {
        let stamp = fixed_stamp();
        assert_eq!(stamp.time, "09:05:02.000000");
        assert_eq!(stamp.date, "07/03/2024");
    }

    #[test]
    fn test_stamp_full_line() {
        let line = "1\t2.5\t0\t100\t20.0\t0.1\t22.3\t101325\t0:0:1\t0:0:0\tDetA";
        let stamped = stamp_line(line, &fixed_stamp());
        let fields: Vec<&str> = stamped.split('\t').collect();
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[10], "DetA");
        assert_eq!(fields[11], "09:05:02.000000");
        assert_eq!(fields[12], "07/03/2024");
    }

    #[test]
    fn test_stamp_pads_short_line() {
        let line = "1\t2.5\t0\t100\t20.0\t0.1";
        let stamped = stamp_line(line, &fixed_stamp());
        let fields: Vec<&str> = stamped.split('\t').collect();
        assert_eq!(fields.len(), 13);
        assert!(fields[6..11].iter().all(|f| f.is_empty()));
        assert_eq!(fields[11], "09:05:02.000000");
    }

    #[test]
    fn test_stamp_keeps_position_with_extra_columns() {
        let line = "1\t2.5\t0\t100\t20.0\t0.1\t22.3\t101325\t0:0:1\t0:0:0\tDetA\tfw2\tx";
        let stamped = stamp_line(line, &fixed_stamp());
        let fields: Vec<&str> = stamped.split('\t').collect();
        assert_eq!(fields.len(), 15);
        assert_eq!(fields[10], "DetA");
        assert_eq!(fields[11], "09:05:02.000000");
        assert_eq!(fields[12], "07/03/2024");
        assert_eq!(&fields[13..], ["fw2", "x"]);
    }

    #[test]
    fn test_stamp_strips_line_ending() {
        let line = "1\t2.5\t0\t100\t20.0\t0.1\r\n";
        let stamped = stamp_line(line, &fixed_stamp());
        assert!(!stamped.contains('\r'));
        assert!(stamped.ends_with("07/03/2024"));
    }

    #[test]
    fn test_truncated_line_unchanged() {
        let stamped = stamp_line("1\t2.5\t0", &fixed_stamp());
        assert_eq!(stamped, "1\t2.5\t0");
    }
}
