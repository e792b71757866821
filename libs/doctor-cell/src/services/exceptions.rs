// libs/doctor-cell/src/services/exceptions.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    BlockReason, BlockedInterval, DoctorError, EmergencySlotPolicy, ExceptionCalendar, OffDay,
};

impl EmergencySlotPolicy {
    pub fn new(slots_per_day: i32, release_threshold_hours: i32) -> Result<Self, DoctorError> {
        if slots_per_day < 0 {
            return Err(DoctorError::ValidationError(
                "Emergency slots per day cannot be negative".to_string(),
            ));
        }
        if release_threshold_hours < 0 {
            return Err(DoctorError::ValidationError(
                "Emergency release threshold cannot be negative".to_string(),
            ));
        }
        Ok(Self { slots_per_day, release_threshold_hours })
    }

    /// A reserved slot joins the general pool once `now` is within the
    /// threshold of its start. A release point before the earliest
    /// representable instant counts as already passed.
    pub fn is_released(&self, slot_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match slot_start.checked_sub_signed(Duration::hours(self.release_threshold_hours as i64)) {
            Some(release_at) => now >= release_at,
            None => true,
        }
    }
}

impl ExceptionCalendar {
    pub fn off_days(&self) -> &[OffDay] {
        &self.off_days
    }

    pub fn blocked_intervals(&self) -> &[BlockedInterval] {
        &self.blocked_intervals
    }

    pub fn emergency_policy(&self) -> EmergencySlotPolicy {
        self.emergency_policy
    }

    pub fn is_off_day(&self, date: NaiveDate) -> bool {
        self.off_days.iter().any(|off_day| off_day.date == date)
    }

    /// Blocked windows for `date`, sorted ascending with overlapping or
    /// touching entries merged.
    pub fn blocked_ranges(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        let mut ranges: Vec<(NaiveTime, NaiveTime)> = self
            .blocked_intervals
            .iter()
            .filter(|interval| interval.date == date)
            .map(|interval| (interval.start_time, interval.end_time))
            .collect();
        ranges.sort();

        let mut merged: Vec<(NaiveTime, NaiveTime)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => {
                    if end > last.1 {
                        last.1 = end;
                    }
                }
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    /// Number of slots still held back for emergencies on `date`.
    ///
    /// `slot_starts` are the day's open slot start times in ascending order.
    /// The last `slots_per_day` of them form the reserved set and each one is
    /// released on its own schedule; since earlier slots release first, the
    /// returned count always describes a suffix of `slot_starts`.
    pub fn emergency_reserved_count(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
        slot_starts: &[NaiveTime],
    ) -> usize {
        let policy = self.emergency_policy;
        if policy.slots_per_day <= 0 {
            return 0;
        }

        let reserved_from = slot_starts.len().saturating_sub(policy.slots_per_day as usize);
        slot_starts[reserved_from..]
            .iter()
            .filter(|start| !policy.is_released(date.and_time(**start).and_utc(), now))
            .count()
    }

    pub fn add_off_day(&mut self, date: NaiveDate, reason: String) -> Result<&OffDay, DoctorError> {
        if self.is_off_day(date) {
            return Err(DoctorError::ValidationError(format!(
                "Off-day already exists for {}",
                date
            )));
        }

        debug!("Adding off-day on {}", date);
        self.off_days.push(OffDay { date, reason });
        self.off_days.sort_by_key(|off_day| off_day.date);

        self.off_days
            .iter()
            .find(|off_day| off_day.date == date)
            .ok_or_else(|| DoctorError::NotFound(format!("Off-day {}", date)))
    }

    pub fn remove_off_day(&mut self, date: NaiveDate) -> Result<OffDay, DoctorError> {
        let index = self
            .off_days
            .iter()
            .position(|off_day| off_day.date == date)
            .ok_or_else(|| DoctorError::NotFound(format!("No off-day on {}", date)))?;
        Ok(self.off_days.remove(index))
    }

    pub fn add_blocked_interval(
        &mut self,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        reason: BlockReason,
    ) -> Result<BlockedInterval, DoctorError> {
        if start_time >= end_time {
            return Err(DoctorError::ValidationError(
                "Blocked interval start must be before its end".to_string(),
            ));
        }

        let interval = BlockedInterval {
            id: Uuid::new_v4(),
            date,
            start_time,
            end_time,
            reason,
        };

        debug!("Blocking {} {}-{} ({:?})", date, start_time, end_time, reason);
        self.blocked_intervals.push(interval.clone());
        self.blocked_intervals
            .sort_by_key(|existing| (existing.date, existing.start_time));

        Ok(interval)
    }

    pub fn remove_blocked_interval(&mut self, interval_id: Uuid) -> Result<BlockedInterval, DoctorError> {
        let index = self
            .blocked_intervals
            .iter()
            .position(|interval| interval.id == interval_id)
            .ok_or_else(|| DoctorError::NotFound(format!("Blocked interval {}", interval_id)))?;
        Ok(self.blocked_intervals.remove(index))
    }

    pub fn set_emergency_policy(&mut self, policy: EmergencySlotPolicy) {
        debug!(
            "Emergency policy set: {} slots/day, released {}h before start",
            policy.slots_per_day, policy.release_threshold_hours
        );
        self.emergency_policy = policy;
    }
}
