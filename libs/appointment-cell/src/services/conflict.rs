use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use doctor_cell::models::ExceptionCalendar;

use crate::models::{Appointment, AppointmentError};

pub fn appointments_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Appointments that still hold time and intersect `[start, end)`.
pub fn find_conflicts<'a>(
    appointments: &'a [Appointment],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&'a Appointment> {
    appointments
        .iter()
        .filter(|appointment| appointment.blocks_time())
        .filter(|appointment| {
            appointments_overlap(start, end, appointment.start_datetime, appointment.end_datetime)
        })
        .collect()
}

/// Instant span `[start, end)` covered by an off-day. The last
/// representable day runs to the end of time.
fn off_day_span(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Rejects a requested range that falls on an off-day or overlaps a blocked
/// interval. Cost depends on the number of exceptions, not on the length of
/// the range.
pub fn check_exceptions(
    exceptions: &ExceptionCalendar,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), AppointmentError> {
    for off_day in exceptions.off_days() {
        let (day_start, day_end) = off_day_span(off_day.date);
        if appointments_overlap(start, end, day_start, day_end) {
            warn!("Requested range {} - {} falls on off-day {}", start, end, off_day.date);
            return Err(AppointmentError::SlotConflict(format!(
                "Doctor is not working on {}",
                off_day.date
            )));
        }
    }

    for interval in exceptions.blocked_intervals() {
        let block_start = interval.date.and_time(interval.start_time).and_utc();
        let block_end = interval.date.and_time(interval.end_time).and_utc();
        if appointments_overlap(start, end, block_start, block_end) {
            warn!("Requested range {} - {} overlaps a blocked interval", start, end);
            return Err(AppointmentError::SlotConflict(format!(
                "Time between {} and {} is blocked",
                block_start.format("%Y-%m-%d %H:%M"),
                block_end.format("%H:%M")
            )));
        }
    }

    debug!("No calendar exceptions affect {} - {}", start, end);
    Ok(())
}
