//! Domain types: rooms, stays, schedules and cleaning statuses.

mod status;
mod stay;

pub use status::CleaningStatus;
pub use stay::{Origin, RoomId, RoomSortKey, ScheduleEntry, Stay, StayRecord};
