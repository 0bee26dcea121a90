use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open [start, end) range of wall-clock time
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeRange(pub NaiveDateTime, pub NaiveDateTime);

impl TimeRange {
    /// Construct a new Time Range
    /// Range is half-open on [start, end)
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use probenplan_libs::time::TimeRange;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    /// let test = TimeRange::new(
    ///     day.and_hms_opt(18, 0, 0).unwrap(),
    ///     day.and_hms_opt(20, 0, 0).unwrap(),
    /// );
    ///
    /// assert_eq!(test.duration().num_minutes(), 120);
    /// ```
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> TimeRange {
        TimeRange(start, end)
    }

    /// The whole of `[first, last]`, from midnight of `first` up to midnight after `last`
    pub fn days(first: NaiveDate, last: NaiveDate) -> TimeRange {
        let end = last.succ_opt().map_or(NaiveDateTime::MAX, midnight);
        TimeRange(midnight(first), end)
    }

    pub fn start(self) -> NaiveDateTime {
        self.0
    }

    pub fn end(self) -> NaiveDateTime {
        self.1
    }

    pub fn duration(self) -> Duration {
        self.1 - self.0
    }

    pub fn is_empty(self) -> bool {
        self.1 <= self.0
    }

    /// Ranges overlap when they share any instant. Touching ranges do not overlap.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use probenplan_libs::time::TimeRange;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    /// let at = |h| day.and_hms_opt(h, 0, 0).unwrap();
    ///
    /// assert!(TimeRange::new(at(18), at(20)).overlaps(TimeRange::new(at(19), at(21))));
    /// assert!(!TimeRange::new(at(18), at(19)).overlaps(TimeRange::new(at(19), at(21))));
    /// ```
    pub fn overlaps(self, other: TimeRange) -> bool {
        self.0 < other.1 && other.0 < self.1
    }

    pub fn contains(self, other: TimeRange) -> bool {
        self.0 <= other.0 && other.1 <= self.1
    }

    /// The part of `self` inside `bounds`, if any remains
    pub fn clip(self, bounds: TimeRange) -> Option<TimeRange> {
        let clipped = TimeRange(self.0.max(bounds.0), self.1.min(bounds.1));
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.0, self.1)
    }
}

pub(crate) fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub trait TimeMerge {
    fn time_merge(self) -> Vec<TimeRange>;
}

impl<'a, T> TimeMerge for T
where
    T: Iterator<Item = &'a TimeRange>,
{
    /// Combines overlapping and touching TimeRanges together
    /// Empty ranges are dropped. Input does not need to be sorted.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use probenplan_libs::time::{TimeMerge, TimeRange};
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    /// let at = |h| day.and_hms_opt(h, 0, 0).unwrap();
    ///
    /// let time_merge = vec![
    ///     TimeRange::new(at(12), at(13)),
    ///     TimeRange::new(at(9), at(10)),
    ///     TimeRange::new(at(10), at(11)),
    ///     TimeRange::new(at(9), at(10)),
    /// ];
    ///
    /// assert_eq!(
    ///     time_merge.iter().time_merge(),
    ///     vec![TimeRange::new(at(9), at(11)), TimeRange::new(at(12), at(13))]
    /// );
    /// ```
    fn time_merge(self) -> Vec<TimeRange> {
        let size_hint = self.size_hint().1.unwrap_or(0);
        let (last, mut acc) = self
            .filter(|time| !time.is_empty())
            .sorted_unstable()
            .fold(
                (None, Vec::with_capacity(size_hint)),
                |(last, mut acc), &curr| match last {
                    None => (Some(curr), acc),
                    Some(time) => {
                        if curr.start() <= time.end() {
                            (
                                Some(TimeRange::new(time.start(), time.end().max(curr.end()))),
                                acc,
                            )
                        } else {
                            acc.push(time);
                            (Some(curr), acc)
                        }
                    }
                },
            );

        if let Some(time) = last {
            acc.push(time);
        }

        acc
    }
}
