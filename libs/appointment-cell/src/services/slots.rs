// libs/appointment-cell/src/services/slots.rs
//
// Turns a doctor's weekly template, calendar exceptions and current bookings
// into the ordered list of open slots for a date range.
//

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use doctor_cell::models::{DayAvailability, ExceptionCalendar, WeeklyAvailabilityTemplate};

use crate::models::{Appointment, AppointmentError, Slot};
use crate::services::conflict::appointments_overlap;

/// Read-only view over one doctor's schedule. Holds no state of its own, so
/// the same inputs always resolve to the same slots.
pub struct SlotResolver<'a> {
    template: &'a WeeklyAvailabilityTemplate,
    exceptions: &'a ExceptionCalendar,
    appointments: &'a [Appointment],
    max_range_days: Option<i64>,
}

impl<'a> SlotResolver<'a> {
    pub fn new(
        template: &'a WeeklyAvailabilityTemplate,
        exceptions: &'a ExceptionCalendar,
        appointments: &'a [Appointment],
    ) -> Self {
        Self {
            template,
            exceptions,
            appointments,
            max_range_days: None,
        }
    }

    pub fn with_max_range_days(mut self, max_range_days: i64) -> Self {
        self.max_range_days = Some(max_range_days);
        self
    }

    pub fn resolve(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, AppointmentError> {
        if to_date < from_date {
            return Err(AppointmentError::ValidationError(
                "End date must not be before start date".to_string(),
            ));
        }

        let span_days = (to_date - from_date).num_days() + 1;
        if let Some(max) = self.max_range_days {
            if span_days > max {
                return Err(AppointmentError::ValidationError(format!(
                    "Date range of {} days exceeds the maximum of {}",
                    span_days, max
                )));
            }
        }

        debug!("Resolving slots from {} to {} ({} days)", from_date, to_date, span_days);

        let blocking: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| appointment.blocks_time())
            .collect();

        let mut slots = Vec::new();
        for date in from_date.iter_days().take_while(|date| *date <= to_date) {
            slots.extend(self.resolve_day(date, &blocking, now));
        }

        debug!("Resolved {} open slots", slots.len());
        Ok(slots)
    }

    fn resolve_day(&self, date: NaiveDate, blocking: &[&Appointment], now: DateTime<Utc>) -> Vec<Slot> {
        let Some(day) = self.template.day_for(date) else {
            return Vec::new();
        };
        if !day.enabled || self.exceptions.is_off_day(date) {
            return Vec::new();
        }

        let blocked = self.exceptions.blocked_ranges(date);

        let mut open: Vec<Slot> = candidate_slots(day, date)
            .into_iter()
            .filter(|slot| {
                !blocked
                    .iter()
                    .any(|(start, end)| slot.start_time < *end && *start < slot.end_time)
            })
            .filter(|slot| {
                let (start, end) = (slot.starts_at(), slot.ends_at());
                !blocking.iter().any(|appointment| {
                    appointments_overlap(start, end, appointment.start_datetime, appointment.end_datetime)
                })
            })
            .collect();

        let starts: Vec<_> = open.iter().map(|slot| slot.start_time).collect();
        let reserved = self.exceptions.emergency_reserved_count(date, now, &starts);
        if reserved > 0 {
            debug!("Holding back {} emergency slots on {}", reserved, date);
            open.truncate(open.len() - reserved);
        }

        open
    }
}

/// Consecutive `slot_minutes` windows from the day's start. A trailing window
/// that would run past the end time is dropped.
pub fn candidate_slots(day: &DayAvailability, date: NaiveDate) -> Vec<Slot> {
    if !day.has_valid_window() {
        return Vec::new();
    }

    let step = Duration::minutes(day.slot_minutes as i64);
    let day_end = date.and_time(day.end_time);

    let mut slots = Vec::new();
    let mut cursor = date.and_time(day.start_time);
    while let Some(slot_end) = cursor.checked_add_signed(step).filter(|end| *end <= day_end) {
        slots.push(Slot {
            date,
            start_time: cursor.time(),
            end_time: slot_end.time(),
        });
        cursor = slot_end;
    }

    slots
}
