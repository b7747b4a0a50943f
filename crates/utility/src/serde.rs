pub mod date_time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize as _, Deserializer};

    const NAIVE_DATE_TIME_FORMATS: &[&str] =
        &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    /// Parses the timestamp flavours found in station feeds: RFC 3339,
    /// naive date-times (taken as UTC) and plain dates (midnight UTC).
    /// Returns `None` for anything else rather than guessing.
    pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
            return Some(date_time.with_timezone(&Utc));
        }
        for format in NAIVE_DATE_TIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_utc(&s).ok_or_else(|| Error::custom(format!("invalid timestamp '{s}'")))
    }

    pub fn deserialize_utc_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_utc(&s)
                .map(Some)
                .ok_or_else(|| Error::custom(format!("invalid timestamp '{s}'"))),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use chrono::TimeZone as _;
        use serde::Deserialize;

        use super::*;

        #[test]
        fn parses_rfc3339_with_offset() {
            let parsed = parse_utc("2024-03-01T10:00:00+08:00").unwrap();
            assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap());
        }

        #[test]
        fn parses_naive_and_date_only_as_utc() {
            assert_eq!(
                parse_utc("2024-03-01T10:00:00").unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
            );
            assert_eq!(
                parse_utc("2025-09-01").unwrap(),
                Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()
            );
        }

        #[test]
        fn unknown_formats_are_none() {
            assert_eq!(parse_utc("Unknown"), None);
            assert_eq!(parse_utc(""), None);
            assert_eq!(parse_utc("01/03/2024"), None);
        }

        #[derive(Deserialize)]
        struct Params {
            #[serde(deserialize_with = "deserialize_utc_option", default)]
            at: Option<DateTime<Utc>>,
        }

        #[test]
        fn optional_field_deserializes() {
            let params: Params = serde_json::from_str(r#"{"at":"2024-01-01"}"#).unwrap();
            assert_eq!(
                params.at,
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            );
            let params: Params = serde_json::from_str("{}").unwrap();
            assert_eq!(params.at, None);
        }
    }
}
