//! Per-entity repositories.
//!
//! Each repository owns one access object and exposes the operations the
//! view-state layer needs, so table layout and query text stay below this
//! line. Store errors pass through unchanged.

mod calendar_event;
mod diet_plan;
mod user;
mod user_detail;
mod workout_plan;

pub use calendar_event::CalendarEventRepository;
pub use diet_plan::DietPlanRepository;
pub use user::UserRepository;
pub use user_detail::UserDetailRepository;
pub use workout_plan::WorkoutPlanRepository;
