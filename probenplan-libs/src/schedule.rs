use crate::availability::{Available, AvailabilityRecord};
use crate::candidate::{CandidateSlot, Windowed};
use crate::member::Member;
use crate::time::TimeRange;
use crate::timeline::Timeline;
use chrono::{Duration, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Shortest rehearsal a request may ask for, in minutes
pub const MIN_DURATION_MINUTES: i64 = 30;
/// Longest rehearsal a request may ask for, in minutes
pub const MAX_DURATION_MINUTES: i64 = 8 * 60;
/// How many slots are returned unless configured otherwise
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Serialize, Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Availability of member {member} ends at {end}, which is not after its start {start}")]
    MalformedInterval {
        member: String,
        start: String,
        end: String,
    },
    #[error("Availability of member {member} expires on {expiry}, which is not after it takes effect on {effective}")]
    MalformedRecurrence {
        member: String,
        effective: NaiveDate,
        expiry: NaiveDate,
    },
    #[error("Availability of member {member} is on day {day}, expected 0 (Sunday) to 6 (Saturday)")]
    InvalidDayOfWeek { member: String, day: u8 },
    #[error("Rehearsal duration must be positive, got {minutes} minutes")]
    InvalidDuration { minutes: i64 },
    #[error("Rehearsal duration must be between {min} and {max} minutes, got {minutes}")]
    DurationOutOfRange { minutes: i64, min: i64, max: i64 },
    #[error("Query window ends on {end}, which is not after its start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("At least one member must attend, got a minimum of {found}")]
    InvalidMinimumMembers { found: usize },
}

fn default_minimum_members() -> usize {
    1
}

/// A request for rehearsal times of one band
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RehearsalQuery {
    #[serde(default)]
    pub band_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_minutes: i64,
    #[serde(default = "default_minimum_members")]
    pub minimum_members: usize,
}

impl RehearsalQuery {
    pub fn new(
        band_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        duration_minutes: i64,
    ) -> RehearsalQuery {
        RehearsalQuery {
            band_id: band_id.to_string(),
            start_date,
            end_date,
            duration_minutes,
            minimum_members: default_minimum_members(),
        }
    }

    pub fn with_minimum_members(mut self, minimum_members: usize) -> Self {
        self.minimum_members = minimum_members;
        self
    }

    /// Everything from midnight of `start_date` up to midnight after `end_date`
    pub fn window(&self) -> TimeRange {
        TimeRange::days(self.start_date, self.end_date)
    }

    /// The minimum the finder itself requires: a positive duration and a window that
    /// ends after it starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_minutes <= 0 {
            Err(ValidationError::InvalidDuration {
                minutes: self.duration_minutes,
            })
        } else if self.end_date <= self.start_date {
            Err(ValidationError::InvalidWindow {
                start: self.start_date,
                end: self.end_date,
            })
        } else {
            Ok(())
        }
    }

    /// The rules a hosting layer applies to incoming requests, on top of [`validate`].
    ///
    /// [`validate`]: RehearsalQuery::validate
    pub fn validate_request(&self) -> Result<(), ValidationError> {
        self.validate()?;

        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            Err(ValidationError::DurationOutOfRange {
                minutes: self.duration_minutes,
                min: MIN_DURATION_MINUTES,
                max: MAX_DURATION_MINUTES,
            })
        } else if self.minimum_members == 0 {
            Err(ValidationError::InvalidMinimumMembers {
                found: self.minimum_members,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for RehearsalQuery {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let base =
            NaiveDate::from_ymd_opt(2024, 3, 1).ok_or(arbitrary::Error::IncorrectFormat)?;
        let start_date = base + Duration::days(u.int_in_range(0..=7)?);
        let end_date = start_date + Duration::days(u.int_in_range(1..=14)?);

        Ok(RehearsalQuery::new(
            "fuzz",
            start_date,
            end_date,
            u.int_in_range(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES)?,
        )
        .with_minimum_members(u.int_in_range(1..=6)?))
    }
}

/// Orders candidates by how many members can attend, most first. Equal attendance
/// keeps chronological order. At most `top_k` are kept.
pub fn rank(mut candidates: Vec<CandidateSlot>, top_k: usize) -> Vec<CandidateSlot> {
    candidates.sort_by(|a, b| {
        b.attendance()
            .cmp(&a.attendance())
            .then_with(|| a.start.cmp(&b.start))
    });
    candidates.truncate(top_k);
    candidates
}

/// Finds the rehearsal times most of a band can attend.
///
/// Holds the configuration of the search; a finder has no other state and can be
/// shared freely between requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotFinder {
    top_k: usize,
}

impl Default for SlotFinder {
    fn default() -> Self {
        SlotFinder {
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl SlotFinder {
    pub fn new() -> SlotFinder {
        SlotFinder::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ranks the rehearsal slots of `query` by attendance.
    ///
    /// `availability` is keyed by member id; members of the roster without an entry
    /// are free nowhere and entries for anyone outside the roster are ignored.
    ///
    /// An empty roster, a duration longer than the window, or nobody being free all
    /// give an empty result rather than an error.
    ///
    /// # Errors
    /// The call is rejected with a [`ValidationError`] when the query has a
    /// non-positive duration or a window that does not end after it starts, or when
    /// any availability record of the roster is malformed.
    ///
    /// # Example
    /// ```
    /// use chrono::{NaiveDate, NaiveTime};
    /// use probenplan_libs::{AvailabilityRecord, Member, RehearsalQuery, SlotFinder};
    /// use std::collections::HashMap;
    ///
    /// let date = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    /// let time = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    ///
    /// let roster = vec![Member::new("ana", "Ana", "ana@example.com")];
    /// let availability = HashMap::from([(
    ///     "ana".to_string(),
    ///     // Mondays from 18:00 to 20:00
    ///     vec![AvailabilityRecord::recurring("ana", 1, time(18), time(20), date(1), None)],
    /// )]);
    ///
    /// let slots = SlotFinder::new()
    ///     .with_top_k(1)
    ///     .find(&roster, &availability, &RehearsalQuery::new("band", date(4), date(5), 60))
    ///     .unwrap();
    ///
    /// assert_eq!(slots.len(), 1);
    /// assert_eq!(slots[0].start, date(4).and_time(time(18)));
    /// ```
    pub fn find(
        &self,
        roster: &[Member],
        availability: &HashMap<String, Vec<AvailabilityRecord>>,
        query: &RehearsalQuery,
    ) -> Result<Vec<CandidateSlot>, ValidationError> {
        query.validate()?;

        let members: BTreeSet<String> = roster.iter().map(|member| member.id.clone()).collect();
        for record in members
            .iter()
            .filter_map(|id| availability.get(id))
            .flatten()
        {
            record.validate()?;
        }

        let window = query.window();
        let minimum = query.minimum_members.max(1);

        if members.is_empty() {
            debug!("band {} has no members", query.band_id);
            return Ok(vec![]);
        }
        if query.duration_minutes > window.duration().num_minutes() {
            debug!(
                "{} minutes do not fit into {}",
                query.duration_minutes, window
            );
            return Ok(vec![]);
        }
        if minimum > members.len() {
            debug!(
                "band {} has {} members, {} required",
                query.band_id,
                members.len(),
                minimum
            );
            return Ok(vec![]);
        }

        let ids: Vec<&str> = members.iter().map(String::as_str).collect();

        #[cfg(feature = "rayon")]
        let ids = ids.par_iter();
        #[cfg(not(feature = "rayon"))]
        let ids = ids.iter();

        let free_times: Vec<(&str, Vec<TimeRange>)> = ids
            .map(|&id| {
                let times = availability
                    .get(id)
                    .map(|records| records.iter().get_availability(window))
                    .unwrap_or_default();
                (id, times)
            })
            .collect();

        let timeline = Timeline::build(window, &free_times);
        let candidates = timeline.windowed(
            Duration::minutes(query.duration_minutes),
            minimum,
            &members,
        );

        let ranked = rank(candidates, self.top_k);
        debug!(
            "band {}: returning {} rehearsal slots",
            query.band_id,
            ranked.len()
        );

        Ok(ranked)
    }
}

/// Ranks the rehearsal slots of `query` with the default [`SlotFinder`]
pub fn find_optimal_slots(
    roster: &[Member],
    availability: &HashMap<String, Vec<AvailabilityRecord>>,
    query: &RehearsalQuery,
) -> Result<Vec<CandidateSlot>, ValidationError> {
    SlotFinder::default().find(roster, availability, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        date(day).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn slot(start: NaiveDateTime, available: &[&str]) -> CandidateSlot {
        CandidateSlot {
            start,
            end: start + Duration::minutes(60),
            available_members: available.iter().map(|m| m.to_string()).collect(),
            unavailable_members: BTreeSet::new(),
        }
    }

    #[test]
    fn rank_prefers_attendance_then_time() {
        let ranked = rank(
            vec![
                slot(at(4, 18, 0), &["ana"]),
                slot(at(4, 19, 0), &["ana", "ben"]),
                slot(at(5, 9, 0), &["ana", "ben", "cleo"]),
                slot(at(5, 10, 0), &["ben"]),
                slot(at(6, 18, 0), &["ana", "ben"]),
            ],
            4,
        );

        assert_eq!(
            ranked.iter().map(|s| s.start).collect::<Vec<_>>(),
            vec![at(5, 9, 0), at(4, 19, 0), at(6, 18, 0), at(4, 18, 0)]
        );
    }

    #[test]
    fn validate_rejects_contract_violations() {
        assert_eq!(
            RehearsalQuery::new("b", date(4), date(5), 0).validate(),
            Err(ValidationError::InvalidDuration { minutes: 0 })
        );
        assert_eq!(
            RehearsalQuery::new("b", date(5), date(5), 60).validate(),
            Err(ValidationError::InvalidWindow {
                start: date(5),
                end: date(5)
            })
        );
        assert_eq!(RehearsalQuery::new("b", date(4), date(5), 10).validate(), Ok(()));
    }

    #[test]
    fn validate_request_applies_route_rules() {
        assert!(matches!(
            RehearsalQuery::new("b", date(4), date(5), 10).validate_request(),
            Err(ValidationError::DurationOutOfRange { minutes: 10, .. })
        ));
        assert!(matches!(
            RehearsalQuery::new("b", date(4), date(5), 481).validate_request(),
            Err(ValidationError::DurationOutOfRange { minutes: 481, .. })
        ));
        assert_eq!(
            RehearsalQuery::new("b", date(4), date(5), 60)
                .with_minimum_members(0)
                .validate_request(),
            Err(ValidationError::InvalidMinimumMembers { found: 0 })
        );
        assert_eq!(
            RehearsalQuery::new("b", date(4), date(5), 480).validate_request(),
            Ok(())
        );
    }

    #[test]
    fn query_defaults_minimum_members() {
        let query: RehearsalQuery = serde_json::from_str(
            r#"{"bandId": "b", "startDate": "2024-03-04", "endDate": "2024-03-10", "durationMinutes": 90}"#,
        )
        .unwrap();

        assert_eq!(query, RehearsalQuery::new("b", date(4), date(10), 90));
    }

    #[test]
    fn malformed_records_are_rejected() {
        let roster = vec![Member::new("ana", "Ana", "")];
        let availability = HashMap::from([(
            "ana".to_string(),
            vec![AvailabilityRecord::one_time("ana", at(4, 20, 0), at(4, 18, 0))],
        )]);

        assert!(matches!(
            find_optimal_slots(
                &roster,
                &availability,
                &RehearsalQuery::new("b", date(4), date(5), 60)
            ),
            Err(ValidationError::MalformedInterval { .. })
        ));
    }

    #[test]
    fn records_outside_roster_are_ignored() {
        let roster = vec![Member::new("ana", "Ana", "")];
        let availability = HashMap::from([
            (
                "ana".to_string(),
                vec![AvailabilityRecord::one_time("ana", at(4, 18, 0), at(4, 20, 0))],
            ),
            (
                "zed".to_string(),
                vec![
                    AvailabilityRecord::one_time("zed", at(4, 18, 0), at(4, 20, 0)),
                    AvailabilityRecord::one_time("zed", at(4, 21, 0), at(4, 20, 0)),
                ],
            ),
        ]);

        let slots = find_optimal_slots(
            &roster,
            &availability,
            &RehearsalQuery::new("b", date(4), date(5), 60),
        )
        .unwrap();

        assert_eq!(slots.len(), 1);
        assert_eq!(
            slots[0].available_members,
            BTreeSet::from(["ana".to_string()])
        );
    }

    #[test]
    fn duration_longer_than_window_is_empty() {
        let roster = vec![Member::new("ana", "Ana", "")];
        let availability = HashMap::from([(
            "ana".to_string(),
            vec![AvailabilityRecord::recurring(
                "ana",
                1,
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                date(1),
                None,
            )],
        )]);

        assert_eq!(
            find_optimal_slots(
                &roster,
                &availability,
                &RehearsalQuery::new("b", date(4), date(5), 3 * 24 * 60)
            ),
            Ok(vec![])
        );
    }

    #[test]
    fn top_k_bounds_result() {
        let roster = vec![Member::new("ana", "Ana", ""), Member::new("ben", "Ben", "")];
        let availability = HashMap::from([
            (
                "ana".to_string(),
                (4..10)
                    .map(|day| AvailabilityRecord::one_time("ana", at(day, 18, 0), at(day, 20, 0)))
                    .collect(),
            ),
            (
                "ben".to_string(),
                vec![AvailabilityRecord::one_time("ben", at(8, 19, 0), at(8, 21, 0))],
            ),
        ]);
        let query = RehearsalQuery::new("b", date(4), date(10), 60);

        let slots = SlotFinder::new()
            .with_top_k(3)
            .find(&roster, &availability, &query)
            .unwrap();

        assert_eq!(
            slots.iter().map(|s| s.start).collect::<Vec<_>>(),
            vec![at(8, 19, 0), at(4, 18, 0), at(5, 18, 0)]
        );
        assert_eq!(slots[0].attendance(), 2);
        assert_eq!(SlotFinder::default().top_k(), DEFAULT_TOP_K);
    }
}
