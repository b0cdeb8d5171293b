use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC, truncated to second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(truncate_to_second(OffsetDateTime::now_utc()))
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(truncate_to_second(value)))
    }

    /// Interpret a unix epoch second count as a UTC timestamp.
    pub fn from_unix_timestamp(seconds: i64) -> Result<Self, ValidationError> {
        let value = OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: seconds.to_string(),
            }
        })?;
        Ok(Self(value))
    }

    pub fn unix_timestamp(self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Calendar day this timestamp falls on.
    pub fn date(self) -> CalendarDate {
        CalendarDate(self.0.date())
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

fn truncate_to_second(value: OffsetDateTime) -> OffsetDateTime {
    value.replace_nanosecond(0).unwrap_or(value)
}

/// Calendar day without a time component, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(Date);

impl CalendarDate {
    pub fn today_utc() -> Self {
        CalendarDate(OffsetDateTime::now_utc().date())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        let mut parts = input.splitn(3, '-');
        let year: i32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let month: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let day: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;

        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
        Ok(Self(date))
    }

    /// Date `days` calendar days earlier.
    pub fn minus_days(self, days: u32) -> Self {
        Self(self.0 - Duration::days(i64::from(days)))
    }

    /// Midnight UTC of this day, the day-open anchor timestamp.
    pub fn midnight(self) -> UtcDateTime {
        UtcDateTime(self.0.midnight().assume_utc())
    }

    pub fn into_inner(self) -> Date {
        self.0
    }
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2026-02-20T15:30:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2026-02-20T15:30:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2026-02-20T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn truncates_to_second_precision() {
        let parsed = UtcDateTime::parse("2026-02-20T15:30:00.123456789Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2026-02-20T15:30:00Z");
    }

    #[test]
    fn date_and_midnight_round_trip() {
        let parsed = UtcDateTime::parse("2026-02-20T15:30:00Z").expect("must parse");
        let date = parsed.date();
        assert_eq!(date.to_string(), "2026-02-20");
        assert_eq!(date.midnight().format_rfc3339(), "2026-02-20T00:00:00Z");
    }

    #[test]
    fn parses_calendar_date_and_subtracts_days() {
        let date = CalendarDate::parse("2026-03-01").expect("must parse");
        assert_eq!(date.minus_days(1).to_string(), "2026-02-28");
        assert_eq!(date.minus_days(30).to_string(), "2026-01-30");
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(matches!(
            CalendarDate::parse("2026-13-01"),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(matches!(
            CalendarDate::parse("not-a-date"),
            Err(ValidationError::InvalidDate { .. })
        ));
    }
}
