use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, with = "time_of_day")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "time_of_day")]
    pub end_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Day-granular span with optional times of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSpan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl EventSpan {
    /// Normalizes request dates to calendar days. A time carried inside the
    /// date string is used when no explicit time field is present.
    pub fn normalize(request: &EventRequest) -> Result<Self> {
        let (start_date, embedded_start) = parse_date(&request.start_date, "startDate")?;
        let (end_date, embedded_end) = parse_date(&request.end_date, "endDate")?;

        let start_time = match non_empty(&request.start_time) {
            Some(s) => Some(parse_time(s, "startTime")?),
            None => embedded_start,
        };
        let end_time = match non_empty(&request.end_time) {
            Some(s) => Some(parse_time(s, "endTime")?),
            None => embedded_end,
        };

        if end_date < start_date {
            return Err(AppError::BadRequest(
                "End date cannot be earlier than start date".to_string(),
            ));
        }

        if end_date == start_date {
            if let (Some(start), Some(end)) = (start_time, end_time) {
                if end < start {
                    return Err(AppError::BadRequest(
                        "End time cannot be earlier than start time".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            start_date,
            end_date,
            start_time,
            end_time,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(value: &str, field: &str) -> Result<(NaiveDate, Option<NaiveTime>)> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok((date, None));
    }

    let datetime = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", field, value)))?;

    let time = datetime.time();
    let time = (time.num_seconds_from_midnight() != 0).then(|| truncate_seconds(time));
    Ok((datetime.date(), time))
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(truncate_seconds)
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", field, value)))
}

fn truncate_seconds(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// `HH:MM` representation of an optional time of day.
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| {
                NaiveTime::parse_from_str(&s, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> EventRequest {
        EventRequest {
            title: "Sports day".to_string(),
            description: "Annual".to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn test_plain_dates() {
        let span = EventSpan::normalize(&request("2024-03-01", "2024-03-02")).unwrap();
        assert_eq!(span.start_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(span.end_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert!(span.start_time.is_none());
    }

    #[test]
    fn test_datetime_strings_keep_time_of_day() {
        let span =
            EventSpan::normalize(&request("2024-03-01T09:30:00", "2024-03-01T11:00")).unwrap();
        assert_eq!(span.start_time, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(span.end_time, NaiveTime::from_hms_opt(11, 0, 0));
    }

    #[test]
    fn test_midnight_is_day_only() {
        let span =
            EventSpan::normalize(&request("2024-03-01T00:00:00", "2024-03-01T00:00:00")).unwrap();
        assert!(span.start_time.is_none());
        assert!(span.end_time.is_none());
    }

    #[test]
    fn test_explicit_times_override_embedded() {
        let mut req = request("2024-03-01T09:30:00", "2024-03-01");
        req.start_time = Some("08:15".to_string());
        req.end_time = Some("10:00".to_string());
        let span = EventSpan::normalize(&req).unwrap();
        assert_eq!(span.start_time, NaiveTime::from_hms_opt(8, 15, 0));
    }

    #[test]
    fn test_end_before_start_rejected() {
        assert!(matches!(
            EventSpan::normalize(&request("2024-03-02", "2024-03-01")),
            Err(AppError::BadRequest(_))
        ));

        let mut same_day = request("2024-03-01", "2024-03-01");
        same_day.start_time = Some("14:00".to_string());
        same_day.end_time = Some("13:00".to_string());
        assert!(EventSpan::normalize(&same_day).is_err());
    }

    #[test]
    fn test_missing_and_garbage_dates_rejected() {
        assert!(EventSpan::normalize(&request("", "2024-03-01")).is_err());
        assert!(EventSpan::normalize(&request("next tuesday", "2024-03-01")).is_err());
    }
}
