// libs/doctor-cell/src/services/availability.rs

use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::debug;

use shared_config::DefaultSchedulePolicy;

use crate::models::{DayAvailability, DoctorError, WeeklyAvailabilityTemplate};

/// 0 = Sunday, 1 = Monday, etc.
pub fn day_of_week(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

pub fn validate_day_of_week(day: i32) -> Result<(), DoctorError> {
    if !(0..=6).contains(&day) {
        return Err(DoctorError::ValidationError(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    Ok(())
}

fn validate_window(start: NaiveTime, end: NaiveTime, slot_minutes: i32) -> Result<(), DoctorError> {
    if start >= end {
        return Err(DoctorError::ValidationError(
            "Start time must be before end time".to_string(),
        ));
    }
    if slot_minutes <= 0 {
        return Err(DoctorError::ValidationError(
            "Slot duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

impl WeeklyAvailabilityTemplate {
    /// Builds the template used when a caller explicitly opts into the
    /// default-policy fallback for an unconfigured doctor.
    pub fn from_policy(policy: &DefaultSchedulePolicy) -> Self {
        let mut template = Self::default();
        for &day in &policy.working_days {
            if validate_day_of_week(day).is_err() {
                continue;
            }
            template.days.insert(day, DayAvailability {
                day_of_week: day,
                enabled: true,
                start_time: policy.start_time,
                end_time: policy.end_time,
                slot_minutes: policy.slot_minutes,
            });
        }
        template
    }

    pub fn is_configured(&self) -> bool {
        !self.days.is_empty()
    }

    pub fn day(&self, day_of_week: i32) -> Option<&DayAvailability> {
        self.days.get(&day_of_week)
    }

    /// Template entry governing `date`, if its weekday has been configured.
    pub fn day_for(&self, date: NaiveDate) -> Option<&DayAvailability> {
        self.day(day_of_week(date))
    }

    pub fn days(&self) -> impl Iterator<Item = &DayAvailability> {
        self.days.values()
    }

    /// A disabled day is stored as given; the window is only validated when
    /// the day is bookable.
    pub fn set_day(
        &mut self,
        day_of_week: i32,
        enabled: bool,
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_minutes: i32,
    ) -> Result<&DayAvailability, DoctorError> {
        validate_day_of_week(day_of_week)?;
        if enabled {
            validate_window(start_time, end_time, slot_minutes)?;
        }

        debug!(
            "Setting availability for day {}: enabled={} {}-{} ({} min slots)",
            day_of_week, enabled, start_time, end_time, slot_minutes
        );

        self.days.insert(day_of_week, DayAvailability {
            day_of_week,
            enabled,
            start_time,
            end_time,
            slot_minutes,
        });

        self.days
            .get(&day_of_week)
            .ok_or_else(|| DoctorError::NotFound(format!("No availability for day {}", day_of_week)))
    }

    /// Copies the source day's window and slot length onto every other
    /// weekday and enables them. The source day's own `enabled` flag is left
    /// as it was.
    pub fn copy_to_all_days(&mut self, source_day: i32) -> Result<(), DoctorError> {
        validate_day_of_week(source_day)?;

        let source = self.days.get(&source_day).cloned().ok_or_else(|| {
            DoctorError::NotFound(format!("No availability configured for day {}", source_day))
        })?;
        validate_window(source.start_time, source.end_time, source.slot_minutes)?;

        debug!("Copying availability of day {} to all other days", source_day);

        for day in (0..=6).filter(|day| *day != source_day) {
            self.days.insert(day, DayAvailability {
                day_of_week: day,
                enabled: true,
                ..source.clone()
            });
        }

        Ok(())
    }
}
