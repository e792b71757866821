use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub max_range_days: i64,
    pub default_day_start: NaiveTime,
    pub default_day_end: NaiveTime,
    pub default_slot_minutes: i32,
    pub default_working_days: Vec<i32>,
}

/// Working hours applied to a doctor with no configured template when the
/// caller explicitly asks for the default-policy fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSchedulePolicy {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
    pub working_days: Vec<i32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            max_range_days: 92,
            default_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            default_day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            default_slot_minutes: 30,
            default_working_days: vec![1, 2, 3, 4, 5],
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                warn!("SERVER_HOST not set, using {}", defaults.server_host);
                defaults.server_host.clone()
            }),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            max_range_days: positive_var("SCHEDULE_MAX_RANGE_DAYS", defaults.max_range_days),
            default_day_start: time_var("DEFAULT_DAY_START", defaults.default_day_start),
            default_day_end: time_var("DEFAULT_DAY_END", defaults.default_day_end),
            default_slot_minutes: parse_var("DEFAULT_SLOT_MINUTES", defaults.default_slot_minutes),
            default_working_days: days_var("DEFAULT_WORKING_DAYS", defaults.default_working_days),
        };

        if !config.is_default_policy_valid() {
            warn!("Default schedule policy is invalid - fallback resolution will produce no slots");
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn default_policy(&self) -> DefaultSchedulePolicy {
        DefaultSchedulePolicy {
            start_time: self.default_day_start,
            end_time: self.default_day_end,
            slot_minutes: self.default_slot_minutes,
            working_days: self.default_working_days.clone(),
        }
    }

    pub fn is_default_policy_valid(&self) -> bool {
        self.default_day_start < self.default_day_end
            && self.default_slot_minutes > 0
            && self.default_working_days.iter().all(|day| (0..=6).contains(day))
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn positive_var(name: &str, default: i64) -> i64 {
    let value = parse_var(name, default);
    if value <= 0 {
        warn!("{} must be positive, got {}, using {}", name, value, default);
        return default;
    }
    value
}

fn time_var(name: &str, default: NaiveTime) -> NaiveTime {
    match env::var(name) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", name, raw, default.format("%H:%M"));
            default
        }),
        Err(_) => default,
    }
}

fn days_var(name: &str, default: Vec<i32>) -> Vec<i32> {
    let Ok(raw) = env::var(name) else {
        return default;
    };

    let parsed: Result<Vec<i32>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<i32>)
        .collect();

    match parsed {
        Ok(days) if days.iter().all(|day| (0..=6).contains(day)) => days,
        _ => {
            warn!("{} has invalid value '{}', using {:?}", name, raw, default);
            default
        }
    }
}
