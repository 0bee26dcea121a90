use crate::time::TimeRange;
use crate::timeline::Timeline;
use chrono::{Duration, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A proposed rehearsal and who can make it
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub available_members: BTreeSet<String>,
    pub unavailable_members: BTreeSet<String>,
}

impl CandidateSlot {
    /// Splits `roster` into the members in `available` and everyone else
    pub fn new(time: TimeRange, available: BTreeSet<String>, roster: &BTreeSet<String>) -> Self {
        CandidateSlot {
            start: time.start(),
            end: time.end(),
            unavailable_members: roster.difference(&available).cloned().collect(),
            available_members: available,
        }
    }

    pub fn time(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn attendance(&self) -> usize {
        self.available_members.len()
    }
}

pub trait Windowed {
    fn windowed(
        &self,
        duration: Duration,
        minimum_members: usize,
        roster: &BTreeSet<String>,
    ) -> Vec<CandidateSlot>;
}

impl Windowed for Timeline {
    /// Tries every segment boundary as the start of a `duration` long rehearsal.
    /// Only members free for the whole of it count as available, so the free sets of
    /// every segment it touches are intersected. Windows with fewer than
    /// `minimum_members` (and never fewer than one) available are skipped, as are
    /// windows running past the end of the timeline.
    ///
    /// Results are in chronological order.
    fn windowed(
        &self,
        duration: Duration,
        minimum_members: usize,
        roster: &BTreeSet<String>,
    ) -> Vec<CandidateSlot> {
        let minimum = minimum_members.max(1);
        let segments = self.segments();

        let candidates: Vec<CandidateSlot> = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.free.len() >= minimum)
            .filter_map(|(index, segment)| {
                let start = segment.time.start();
                let end = start.checked_add_signed(duration)?;
                if end > self.window().end() {
                    return None;
                }

                let slot = TimeRange::new(start, end);
                let mut available = segment.free.clone();
                for next in segments[index + 1..]
                    .iter()
                    .take_while(|next| next.time.overlaps(slot))
                {
                    available.retain(|member| next.free.contains(member));
                    if available.len() < minimum {
                        return None;
                    }
                }

                Some(CandidateSlot::new(slot, available, roster))
            })
            .collect();

        debug!(
            "{} of {} segment boundaries start a rehearsal of {} minutes",
            candidates.len(),
            segments.len(),
            duration.num_minutes()
        );

        candidates
    }
}
