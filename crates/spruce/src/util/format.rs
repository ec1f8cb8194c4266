use chrono::{DateTime, Utc};

pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 5, 9, 30, 0).unwrap();
        assert_eq!(format_utc(&dt), "2026-08-05 09:30:00 UTC");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "policy", "policies"), "1 policy");
        assert_eq!(format_count(3, "policy", "policies"), "3 policies");
    }
}
