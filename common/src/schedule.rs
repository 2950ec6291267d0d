use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Day of week under the dashboard's two-letter locale codes, Sunday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    #[serde(rename = "Do")]
    Sun,
    #[serde(rename = "Lu")]
    Mon,
    #[serde(rename = "Ma")]
    Tue,
    #[serde(rename = "Mi")]
    Wed,
    #[serde(rename = "Ju")]
    Thu,
    #[serde(rename = "Vi")]
    Fri,
    #[serde(rename = "Sa")]
    Sat,
}

impl DayOfWeek {
    pub fn index(self) -> usize {
        match self {
            Self::Sun => 0,
            Self::Mon => 1,
            Self::Tue => 2,
            Self::Wed => 3,
            Self::Thu => 4,
            Self::Fri => 5,
            Self::Sat => 6,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index % 7 {
            0 => Self::Sun,
            1 => Self::Mon,
            2 => Self::Tue,
            3 => Self::Wed,
            4 => Self::Thu,
            5 => Self::Fri,
            _ => Self::Sat,
        }
    }

    pub fn from_abbrev(token: &str) -> Option<Self> {
        match token {
            "Do" => Some(Self::Sun),
            "Lu" => Some(Self::Mon),
            "Ma" => Some(Self::Tue),
            "Mi" => Some(Self::Wed),
            "Ju" => Some(Self::Thu),
            "Vi" => Some(Self::Fri),
            "Sa" => Some(Self::Sat),
            _ => None,
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Self::Sun => "Do",
            Self::Mon => "Lu",
            Self::Tue => "Ma",
            Self::Wed => "Mi",
            Self::Thu => "Ju",
            Self::Fri => "Vi",
            Self::Sat => "Sa",
        }
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => Self::Sun,
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
        }
    }
}

/// Wall-clock "HH:MM" used by the desired-schedule fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleTime {
    pub hour: u8,
    pub minute: u8,
}

impl FromStr for ScheduleTime {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        let (hour, minute) = value
            .split_once(':')
            .ok_or_else(|| Error::Validation(format!("invalid time format: {value}")))?;
        let hour: u8 = hour
            .parse()
            .map_err(|_| Error::Validation(format!("invalid time format: {value}")))?;
        let minute: u8 = minute
            .parse()
            .map_err(|_| Error::Validation(format!("invalid time format: {value}")))?;

        if hour > 23 || minute > 59 {
            return Err(Error::Validation(format!("time out of range: {value}")));
        }

        Ok(Self { hour, minute })
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ScheduleTime {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        value.parse()
    }
}

impl From<ScheduleTime> for String {
    fn from(time: ScheduleTime) -> Self {
        time.to_string()
    }
}

/// The schedule a device record asks for; persisted independently of the
/// live triggers that realize it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredSchedule {
    #[serde(rename = "turnOnAt", default)]
    pub turn_on_at: Option<ScheduleTime>,
    #[serde(rename = "turnOffAt", default)]
    pub turn_off_at: Option<ScheduleTime>,
    #[serde(rename = "scheduledDays", default)]
    pub days: Vec<DayOfWeek>,
    #[serde(default)]
    pub input: Option<String>,
}

impl DesiredSchedule {
    pub fn is_empty(&self) -> bool {
        self.turn_on_at.is_none() && self.turn_off_at.is_none() && self.days.is_empty()
    }
}

/// Strictly-future wall-clock instant of the next weekly occurrence of
/// `day` + `at`, seen from `now`. An occurrence landing exactly on `now`
/// wraps to the following week.
pub fn next_occurrence(
    now: DateTime<FixedOffset>,
    day: DayOfWeek,
    at: ScheduleTime,
) -> Option<DateTime<FixedOffset>> {
    let now_day = DayOfWeek::from_chrono(now.weekday());

    for day_offset in 0..=7i64 {
        if DayOfWeek::from_index(now_day.index() + day_offset as usize) != day {
            continue;
        }

        let date = now.date_naive() + Duration::days(day_offset);
        let Some(naive) = date.and_hms_opt(at.hour as u32, at.minute as u32, 0) else {
            continue;
        };
        let Some(candidate) = now.offset().from_local_datetime(&naive).single() else {
            continue;
        };

        if candidate > now {
            return Some(candidate);
        }
    }

    None
}
