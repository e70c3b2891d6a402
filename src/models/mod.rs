mod calendar_event;
mod diet_plan;
mod meal_type;
mod user;
mod user_detail;
mod workout_plan;

pub use calendar_event::CalendarEvent;
pub use diet_plan::DietPlan;
pub use meal_type::MealType;
pub use user::User;
pub use user_detail::UserDetail;
pub use workout_plan::WorkoutPlan;
