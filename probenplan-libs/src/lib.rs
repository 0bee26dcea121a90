pub mod availability;
pub mod candidate;
pub mod member;
pub mod schedule;
pub mod time;
pub mod timeline;

pub use availability::{group_by_member, AvailabilityRecord, Available, Recurrence};
pub use candidate::{CandidateSlot, Windowed};
pub use member::{roster_for_band, Member, MemberRole, Role};
pub use schedule::{find_optimal_slots, rank, RehearsalQuery, SlotFinder, ValidationError};
pub use time::{TimeMerge, TimeRange};
pub use timeline::{Segment, Timeline};
