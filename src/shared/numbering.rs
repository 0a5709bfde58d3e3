use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Human-readable number derived from a record id: `PREFIX-YYYYMMDD-XXXXXXXX`,
/// where the suffix is the first 8 hex digits of the id, uppercased.
pub fn record_number(prefix: &str, at: DateTime<Utc>, id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        at.format("%Y%m%d"),
        hex[..8].to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_number_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 23, 59, 0).unwrap();
        let id = Uuid::parse_str("0a1b2c3d-4e5f-4a6b-8c7d-9e8f7a6b5c4d").unwrap();
        assert_eq!(record_number("INV", at, id), "INV-20250307-0A1B2C3D");
        assert_eq!(record_number("RCT", at, id), "RCT-20250307-0A1B2C3D");
    }
}
