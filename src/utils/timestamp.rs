use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Naive datetime layouts tried in order
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a measurement timestamp into a naive (UTC-normalised) datetime.
///
/// Offsets (`Z`, `+01:00`) are converted to UTC; bare dates map to midnight.
///
/// # Examples
/// ```
/// use solar_analytics::utils::parse_timestamp;
///
/// let ts = parse_timestamp("2021-08-09 00:01").unwrap();
/// assert_eq!(ts.to_string(), "2021-08-09 00:01:00");
/// ```
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_variants_agree() {
        let expected = NaiveDate::from_ymd_opt(2021, 8, 9)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2021-08-09 13:45"), Some(expected));
        assert_eq!(parse_timestamp("2021-08-09T13:45"), Some(expected));
        assert_eq!(parse_timestamp("2021-08-09 13:45:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2021-08-09T13:45:00.000 "), Some(expected));
        assert_eq!(parse_timestamp("2021/08/09 13:45"), Some(expected));
        assert_eq!(parse_timestamp("09/08/2021 13:45"), Some(expected));
    }

    #[test]
    fn test_offsets_normalised_to_utc() {
        let ts = parse_timestamp("2021-08-09T13:45:00+01:00").unwrap();
        assert_eq!(ts.to_string(), "2021-08-09 12:45:00");

        let ts = parse_timestamp("2021-08-09T13:45:00Z").unwrap();
        assert_eq!(ts.to_string(), "2021-08-09 13:45:00");
    }

    #[test]
    fn test_date_only() {
        let ts = parse_timestamp("2022-01-31").unwrap();
        assert_eq!(ts.to_string(), "2022-01-31 00:00:00");
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2021-13-01 00:00"), None);
        assert_eq!(parse_timestamp("2021-08-09 25:00"), None);
    }
}
