//! Storage Transfer Service shapes

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferJob {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub description: String,
    /// `ENABLED`, `DISABLED` or `DELETED`
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub latest_operation_name: Option<String>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub schedule_start_date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_of_day: Option<TimeOfDay>,
}

impl Schedule {
    /// Run once, today, starting at `now`
    pub fn once(now: DateTime<Utc>) -> Self {
        Self {
            schedule_start_date: Date::from(now),
            schedule_end_date: Some(Date::from(now)),
            start_time_of_day: Some(TimeOfDay::from(now)),
        }
    }

    /// Run every day from `now` on
    pub fn daily(now: DateTime<Utc>) -> Self {
        Self {
            schedule_start_date: Date::from(now),
            schedule_end_date: None,
            start_time_of_day: Some(TimeOfDay::from(now)),
        }
    }
}

/// `google.type.Date`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<DateTime<Utc>> for Date {
    fn from(t: DateTime<Utc>) -> Self {
        Self {
            year: t.year(),
            month: t.month(),
            day: t.day(),
        }
    }
}

/// `google.type.TimeOfDay`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl From<DateTime<Utc>> for TimeOfDay {
    fn from(t: DateTime<Utc>) -> Self {
        Self {
            hours: t.hour(),
            minutes: t.minute(),
            seconds: t.second(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_once_schedule_starts_and_ends_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 42).unwrap();
        let value = serde_json::to_value(Schedule::once(now)).unwrap();
        assert_eq!(
            value,
            json!({
                "scheduleStartDate": { "year": 2024, "month": 3, "day": 9 },
                "scheduleEndDate": { "year": 2024, "month": 3, "day": 9 },
                "startTimeOfDay": { "hours": 17, "minutes": 5, "seconds": 42 },
            })
        );
    }

    #[test]
    fn test_daily_schedule_has_no_end() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let schedule = Schedule::daily(now);
        assert!(schedule.schedule_end_date.is_none());
        assert_eq!(schedule.schedule_start_date, Date { year: 2024, month: 12, day: 31 });
    }
}
