use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Utc};
use std::{fmt, str::FromStr};

/// How instants are mapped onto calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimezonePolicy {
    Utc,
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl FromStr for TimezonePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("utc") || value == "Z" {
            return Ok(Self::Utc);
        }
        if value.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        parse_offset(value)
            .map(Self::Fixed)
            .ok_or_else(|| format!("unrecognized timezone policy '{value}'"))
    }
}

impl fmt::Display for TimezonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("utc"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

// Accepts "+HH:MM", "-HH:MM" and "+HHMM".
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn local_date(instant: DateTime<Utc>, policy: TimezonePolicy) -> NaiveDate {
    match policy {
        TimezonePolicy::Utc => instant.date_naive(),
        TimezonePolicy::Local => instant.with_timezone(&Local).date_naive(),
        TimezonePolicy::Fixed(offset) => instant.with_timezone(&offset).date_naive(),
    }
}

/// Canonical `YYYY-MM-DD` key of the calendar day `instant` falls on.
pub fn day_key(instant: DateTime<Utc>, policy: TimezonePolicy) -> String {
    date_key(local_date(instant, policy))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM` prefix of a day key.
pub fn month_key(day_key: &str) -> &str {
    day_key.get(..7).unwrap_or(day_key)
}

pub fn month_key_of(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Splits a `YYYY-MM` key into year and month number.
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
    }

    #[test]
    fn same_utc_day_shares_key() {
        let morning = at(2024, 3, 5, 0, 1);
        let night = at(2024, 3, 5, 23, 59);
        assert_eq!(day_key(morning, TimezonePolicy::Utc), "2024-03-05");
        assert_eq!(
            day_key(morning, TimezonePolicy::Utc),
            day_key(night, TimezonePolicy::Utc)
        );
        assert_ne!(
            day_key(night, TimezonePolicy::Utc),
            day_key(at(2024, 3, 6, 0, 0), TimezonePolicy::Utc)
        );
    }

    #[test]
    fn fixed_offset_moves_day_boundary() {
        let policy: TimezonePolicy = "+05:30".parse().unwrap();
        assert_eq!(day_key(at(2024, 3, 5, 20, 0), policy), "2024-03-06");

        let policy: TimezonePolicy = "-08:00".parse().unwrap();
        assert_eq!(day_key(at(2024, 3, 1, 3, 0), policy), "2024-02-29");
    }

    #[test]
    fn month_key_is_prefix() {
        assert_eq!(month_key("2024-02-29"), "2024-02");
        assert_eq!(month_key_of(NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()), "2024-11");
    }

    #[test]
    fn parses_policies() {
        assert_eq!("UTC".parse::<TimezonePolicy>(), Ok(TimezonePolicy::Utc));
        assert_eq!("local".parse::<TimezonePolicy>(), Ok(TimezonePolicy::Local));
        assert_eq!(
            "+0200".parse::<TimezonePolicy>(),
            Ok(TimezonePolicy::Fixed(FixedOffset::east_opt(7200).unwrap()))
        );
        assert!("+25:00".parse::<TimezonePolicy>().is_err());
        assert!("Europe/Berlin".parse::<TimezonePolicy>().is_err());
    }

    #[test]
    fn month_keys_round_trip_into_parts() {
        assert_eq!(parse_month_key("2024-02"), Some((2024, 2)));
        assert_eq!(parse_month_key("2024-13"), None);
        assert_eq!(parse_month_key("24-02"), None);
    }

    #[test]
    fn labels_months() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(month_label(date), "March 2024");
        assert_eq!(previous_day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).to_string(), "2024-02-29");
    }
}
