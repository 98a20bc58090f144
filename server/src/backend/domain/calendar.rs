//! Canonical server-side calendar.
//!
//! Every "today" in the service (daily play guard, rotation date, free wheel
//! spin) comes from here, evaluated at a configured UTC offset. Clients never
//! supply the date.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::{Arc, Mutex};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct CalendarService {
    offset: FixedOffset,
    /// When set, the calendar reports this instant instead of the wall clock
    frozen_now: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl CalendarService {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("Invalid UTC offset: {} hours", utc_offset_hours))?;
        Ok(Self {
            offset,
            frozen_now: Arc::new(Mutex::new(None)),
        })
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
            frozen_now: Arc::new(Mutex::new(None)),
        }
    }

    /// Pin the clock to a fixed instant
    pub fn freeze_at(&self, instant: DateTime<Utc>) {
        let mut frozen = match self.frozen_now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *frozen = Some(instant);
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        let frozen = match self.frozen_now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        frozen.unwrap_or_else(Utc::now).with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Today as YYYY-MM-DD
    pub fn today_string(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }

    pub fn now_rfc3339(&self) -> String {
        self.now().to_rfc3339()
    }

    pub fn days_from_now_rfc3339(&self, days: u32) -> String {
        (self.now() + Duration::days(days as i64)).to_rfc3339()
    }

    /// True when the RFC 3339 instant lies in the past. Unparseable values
    /// count as expired.
    pub fn is_past(&self, rfc3339: &str) -> bool {
        match DateTime::parse_from_rfc3339(rfc3339) {
            Ok(instant) => instant <= self.now(),
            Err(_) => true,
        }
    }
}
