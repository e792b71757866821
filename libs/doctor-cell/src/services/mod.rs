pub mod availability;
pub mod calendar;
pub mod exceptions;
pub mod publication;

pub use availability::{day_of_week, validate_day_of_week};
