pub mod conflict;
pub mod lifecycle;
pub mod registry;
pub mod schedule;
pub mod slots;

pub use lifecycle::AppointmentLifecycleService;
pub use registry::ScheduleRegistry;
pub use schedule::Schedule;
pub use slots::SlotResolver;
