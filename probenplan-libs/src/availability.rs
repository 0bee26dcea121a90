use crate::schedule::ValidationError;
use crate::time::{midnight, TimeMerge, TimeRange};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// When an availability record applies
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Recurrence {
    /// A single absolute stretch of time
    #[serde(rename_all = "camelCase")]
    OneTime {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Every `day_of_week` (0 = Sunday) from `effective_date` until, but not
    /// including, `expiry_date`
    #[serde(rename_all = "camelCase")]
    Recurring {
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
        effective_date: NaiveDate,
        #[serde(default)]
        expiry_date: Option<NaiveDate>,
    },
}

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub member_id: String,
    #[serde(flatten)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AvailabilityRecord {
    pub fn one_time(member_id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        AvailabilityRecord {
            member_id: member_id.to_string(),
            recurrence: Recurrence::OneTime { start, end },
            priority: 0,
            notes: None,
        }
    }

    pub fn recurring(
        member_id: &str,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
        effective_date: NaiveDate,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        AvailabilityRecord {
            member_id: member_id.to_string(),
            recurrence: Recurrence::Recurring {
                day_of_week,
                start_time,
                end_time,
                effective_date,
                expiry_date,
            },
            priority: 0,
            notes: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Checks the record is well formed: it ends after it starts, expires after it
    /// takes effect, and names a real weekday.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.recurrence {
            Recurrence::OneTime { start, end } if end <= start => {
                Err(ValidationError::MalformedInterval {
                    member: self.member_id.clone(),
                    start: start.to_string(),
                    end: end.to_string(),
                })
            }
            Recurrence::Recurring {
                day_of_week,
                start_time,
                end_time,
                effective_date,
                expiry_date,
            } => {
                if day_of_week > 6 {
                    Err(ValidationError::InvalidDayOfWeek {
                        member: self.member_id.clone(),
                        day: day_of_week,
                    })
                } else if end_time <= start_time {
                    Err(ValidationError::MalformedInterval {
                        member: self.member_id.clone(),
                        start: start_time.to_string(),
                        end: end_time.to_string(),
                    })
                } else if let Some(expiry) = expiry_date.filter(|&e| e <= effective_date) {
                    Err(ValidationError::MalformedRecurrence {
                        member: self.member_id.clone(),
                        effective: effective_date,
                        expiry,
                    })
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Every stretch of this record that falls inside `window`, clipped to it
    ///
    /// # Examples
    /// ```
    /// use chrono::{NaiveDate, NaiveTime};
    /// use probenplan_libs::availability::AvailabilityRecord;
    /// use probenplan_libs::time::TimeRange;
    ///
    /// let date = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    /// let time = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    ///
    /// // Mondays from 18:00 to 20:00
    /// let record = AvailabilityRecord::recurring("ana", 1, time(18), time(20), date(1), None);
    ///
    /// assert_eq!(
    ///     record.occurrences(TimeRange::days(date(4), date(17))),
    ///     vec![
    ///         TimeRange::new(date(4).and_time(time(18)), date(4).and_time(time(20))),
    ///         TimeRange::new(date(11).and_time(time(18)), date(11).and_time(time(20))),
    ///     ]
    /// );
    /// ```
    pub fn occurrences(&self, window: TimeRange) -> Vec<TimeRange> {
        match self.recurrence {
            Recurrence::OneTime { start, end } => {
                TimeRange::new(start, end).clip(window).into_iter().collect()
            }
            Recurrence::Recurring {
                day_of_week,
                start_time,
                end_time,
                effective_date,
                expiry_date,
            } => {
                let first = window.start().date().max(effective_date);
                let offset = (i64::from(day_of_week) + 7
                    - i64::from(first.weekday().num_days_from_sunday()))
                    % 7;

                let mut times = Vec::new();
                let mut date = first.checked_add_signed(Duration::days(offset));

                while let Some(day) = date {
                    if midnight(day) >= window.end()
                        || expiry_date.map_or(false, |expiry| day >= expiry)
                    {
                        break;
                    }

                    if let Some(time) =
                        TimeRange::new(day.and_time(start_time), day.and_time(end_time)).clip(window)
                    {
                        times.push(time);
                    }

                    date = day.checked_add_signed(Duration::days(7));
                }

                times
            }
        }
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for AvailabilityRecord {
    /// Well formed records of five members, around March 2024
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let base =
            NaiveDate::from_ymd_opt(2024, 3, 1).ok_or(arbitrary::Error::IncorrectFormat)?;
        let member = format!("member-{}", u.int_in_range(0..=4)?);

        let record = if u.arbitrary::<bool>()? {
            let start = midnight(base) + Duration::minutes(u.int_in_range(-1440..=30 * 1440)?);
            let end = start + Duration::minutes(u.int_in_range(1..=12 * 60)?);
            AvailabilityRecord::one_time(&member, start, end)
        } else {
            let start = u.int_in_range(0..=1438u32)?;
            let end = u.int_in_range(start + 1..=1439u32)?;
            let time = |minute: u32| {
                NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0)
                    .ok_or(arbitrary::Error::IncorrectFormat)
            };
            let effective_date = base + Duration::days(u.int_in_range(-14..=14)?);
            let expiry_date = if u.arbitrary::<bool>()? {
                Some(effective_date + Duration::days(u.int_in_range(1..=28)?))
            } else {
                None
            };

            AvailabilityRecord::recurring(
                &member,
                u.int_in_range(0..=6)?,
                time(start)?,
                time(end)?,
                effective_date,
                expiry_date,
            )
        };

        Ok(record.with_priority(u.int_in_range(0..=5)?))
    }
}

/// Groups a flat list of records by the member they belong to
pub fn group_by_member(
    records: impl IntoIterator<Item = AvailabilityRecord>,
) -> HashMap<String, Vec<AvailabilityRecord>> {
    records
        .into_iter()
        .map(|record| (record.member_id.clone(), record))
        .into_group_map()
}

pub trait Available {
    fn get_availability(self, window: TimeRange) -> Vec<TimeRange>;
}

impl<'a, T> Available for T
where
    T: Iterator<Item = &'a AvailabilityRecord>,
{
    /// Self is the records of a single member.
    /// Expands all of them over `window` and unions the result, so a member is
    /// free wherever *any* record says so.
    fn get_availability(self, window: TimeRange) -> Vec<TimeRange> {
        let times = self
            .flat_map(|record| record.occurrences(window))
            .collect_vec();

        let merged = times.iter().time_merge();
        trace!(
            "{} occurrences merged into {} free times",
            times.len(),
            merged.len()
        );

        merged
    }
}
