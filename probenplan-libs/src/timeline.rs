use crate::time::TimeRange;
use chrono::NaiveDateTime;
use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A stretch of the window during which the same members are free
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct Segment {
    pub time: TimeRange,
    pub free: BTreeSet<String>,
}

/// Boundary of a member's free time. Ends sort before starts at the same instant,
/// so touching intervals never count as overlapping.
#[derive(Eq, PartialEq, Debug)]
enum Time<'a> {
    Start(NaiveDateTime, &'a str),
    End(NaiveDateTime, &'a str),
}

impl<'a> Time<'a> {
    fn at(&self) -> NaiveDateTime {
        match self {
            Time::Start(t, _) | Time::End(t, _) => *t,
        }
    }

    fn member(&self) -> &'a str {
        match self {
            Time::Start(_, m) | Time::End(_, m) => *m,
        }
    }
}

impl Ord for Time<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at()
            .cmp(&other.at())
            .then_with(|| match (self, other) {
                (Time::End(..), Time::Start(..)) => Ordering::Less,
                (Time::Start(..), Time::End(..)) => Ordering::Greater,
                _ => Ordering::Equal,
            })
            .then_with(|| self.member().cmp(other.member()))
    }
}

impl PartialOrd for Time<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Contiguous, disjoint segments covering a whole query window
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct Timeline {
    window: TimeRange,
    segments: Vec<Segment>,
}

impl Timeline {
    /// Sweeps the free times of every member across `window`.
    /// `free_times` holds each member's merged, sorted free times, already clipped to
    /// the window. A new segment starts whenever the set of free members changes;
    /// segments where nobody is free are kept.
    ///
    /// # Panics
    /// In debug builds, when a member's free times are empty, unsorted, touching or
    /// outside the window.
    pub fn build(window: TimeRange, free_times: &[(&str, Vec<TimeRange>)]) -> Timeline {
        debug_assert!(
            free_times.iter().all(|(_, times)| is_normalized(window, times)),
            "free times must be merged, sorted and inside {}",
            window
        );

        let mut events = free_times
            .iter()
            .map(|(member, times)| {
                let member: &str = member;
                times
                    .iter()
                    .flat_map(move |t| [Time::Start(t.start(), member), Time::End(t.end(), member)])
            })
            .kmerge()
            .peekable();

        let mut segments: Vec<Segment> = Vec::new();
        let mut free: BTreeSet<String> = BTreeSet::new();
        let mut cursor = window.start();

        while let Some(event) = events.next() {
            let at = event.at();
            if at > cursor {
                push_segment(&mut segments, TimeRange::new(cursor, at), &free);
                cursor = at;
            }

            apply(&mut free, event);
            while let Some(event) = events.next_if(|e| e.at() == at) {
                apply(&mut free, event);
            }
        }

        if cursor < window.end() {
            push_segment(&mut segments, TimeRange::new(cursor, window.end()), &free);
        }

        debug!(
            "{} members swept into {} segments",
            free_times.len(),
            segments.len()
        );

        Timeline { window, segments }
    }

    pub fn window(&self) -> TimeRange {
        self.window
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn is_normalized(window: TimeRange, times: &[TimeRange]) -> bool {
    times.iter().all(|t| !t.is_empty() && window.contains(*t))
        && times.iter().tuple_windows().all(|(l, r)| l.end() < r.start())
}

fn apply(free: &mut BTreeSet<String>, event: Time) {
    match event {
        Time::Start(_, member) => {
            free.insert(member.to_string());
        }
        Time::End(_, member) => {
            free.remove(member);
        }
    }
}

fn push_segment(segments: &mut Vec<Segment>, time: TimeRange, free: &BTreeSet<String>) {
    match segments.last_mut() {
        Some(last) if last.free == *free && last.time.end() == time.start() => {
            last.time = TimeRange::new(last.time.start(), time.end());
        }
        _ => segments.push(Segment {
            time,
            free: free.clone(),
        }),
    }
}
