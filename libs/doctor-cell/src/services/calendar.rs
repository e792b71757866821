// libs/doctor-cell/src/services/calendar.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    BlockReason, BlockedInterval, DayAvailability, DoctorCalendar, DoctorError,
    EmergencySlotPolicy, ExceptionCalendar, OffDay, PublicationState, WeeklyAvailabilityTemplate,
};

/// Every mutation here either succeeds completely, including the draft
/// downgrade, or returns an error with the calendar untouched. Each inner
/// operation validates before it writes, so the downgrade runs last.
impl DoctorCalendar {
    pub fn new(doctor_id: Uuid) -> Self {
        Self {
            doctor_id,
            template: WeeklyAvailabilityTemplate::default(),
            exceptions: ExceptionCalendar::default(),
            publication: PublicationState::default(),
        }
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }

    pub fn template(&self) -> &WeeklyAvailabilityTemplate {
        &self.template
    }

    pub fn exceptions(&self) -> &ExceptionCalendar {
        &self.exceptions
    }

    pub fn publication(&self) -> &PublicationState {
        &self.publication
    }

    pub fn set_day(
        &mut self,
        day_of_week: i32,
        enabled: bool,
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_minutes: i32,
    ) -> Result<DayAvailability, DoctorError> {
        let day = self
            .template
            .set_day(day_of_week, enabled, start_time, end_time, slot_minutes)?
            .clone();
        self.publication.mark_modified();
        Ok(day)
    }

    pub fn copy_to_all_days(&mut self, source_day: i32) -> Result<(), DoctorError> {
        self.template.copy_to_all_days(source_day)?;
        self.publication.mark_modified();
        Ok(())
    }

    pub fn add_off_day(&mut self, date: NaiveDate, reason: String) -> Result<OffDay, DoctorError> {
        let off_day = self.exceptions.add_off_day(date, reason)?.clone();
        self.publication.mark_modified();
        Ok(off_day)
    }

    pub fn remove_off_day(&mut self, date: NaiveDate) -> Result<OffDay, DoctorError> {
        let removed = self.exceptions.remove_off_day(date)?;
        self.publication.mark_modified();
        Ok(removed)
    }

    pub fn add_blocked_interval(
        &mut self,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        reason: BlockReason,
    ) -> Result<BlockedInterval, DoctorError> {
        let interval = self
            .exceptions
            .add_blocked_interval(date, start_time, end_time, reason)?;
        self.publication.mark_modified();
        Ok(interval)
    }

    pub fn remove_blocked_interval(&mut self, interval_id: Uuid) -> Result<BlockedInterval, DoctorError> {
        let removed = self.exceptions.remove_blocked_interval(interval_id)?;
        self.publication.mark_modified();
        Ok(removed)
    }

    pub fn set_emergency_policy(
        &mut self,
        slots_per_day: i32,
        release_threshold_hours: i32,
    ) -> Result<EmergencySlotPolicy, DoctorError> {
        let policy = EmergencySlotPolicy::new(slots_per_day, release_threshold_hours)?;
        self.exceptions.set_emergency_policy(policy);
        self.publication.mark_modified();
        Ok(policy)
    }

    pub fn publish(&mut self, now: DateTime<Utc>) -> PublicationState {
        debug!("Publishing schedule for doctor {}", self.doctor_id);
        self.publication.publish(now).clone()
    }
}
