//! Business calendar
//!
//! Every booking date is compared as a calendar day in one fixed business
//! timezone. Raw client input (RFC 3339 timestamps or plain `YYYY-MM-DD`
//! dates) goes through [`BusinessCalendar::normalize`] before any
//! arithmetic, so creation-time and update-time checks agree regardless of
//! the client's locale.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use super::errors::DomainError;

/// Default business timezone offset (Asia/Riyadh, no DST).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Calendar-day normalizer bound to the business timezone.
#[derive(Clone)]
pub struct BusinessCalendar {
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BusinessCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessCalendar")
            .field("offset", &self.offset)
            .finish()
    }
}

impl BusinessCalendar {
    pub fn new(offset: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self { offset, clock }
    }

    /// Calendar pinned at `now`, for tests and replay.
    pub fn fixed(offset: FixedOffset, now: DateTime<Utc>) -> Self {
        Self::new(offset, Arc::new(FixedClock(now)))
    }

    /// Parse an offset such as `+03:00`, `-05:30` or `Z`.
    pub fn parse_offset(raw: &str) -> Result<FixedOffset, DomainError> {
        let raw = raw.trim();
        let suffix = if raw.eq_ignore_ascii_case("utc") { "Z" } else { raw };
        DateTime::parse_from_rfc3339(&format!("2000-01-01T00:00:00{}", suffix))
            .map(|dt| *dt.offset())
            .map_err(|_| DomainError::Validation(format!("Invalid UTC offset '{}'", raw)))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.day_of(self.now())
    }

    /// Calendar day an instant falls on in the business timezone.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Normalize raw client input into a business calendar day.
    ///
    /// A plain `YYYY-MM-DD` is taken as that calendar day. Anything carrying
    /// a time and offset is shifted into the business timezone first and
    /// then truncated.
    pub fn normalize(&self, raw: &str) -> Result<NaiveDate, DomainError> {
        let raw = raw.trim();
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(day);
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| self.day_of(dt.with_timezone(&Utc)))
            .map_err(|_| DomainError::Validation(format!("Invalid date: '{}'", raw)))
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        let offset = FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        Self::new(offset, Arc::new(SystemClock))
    }
}

/// Format a calendar day the way user-facing messages show it (`dd/mm/yyyy`).
pub fn format_day(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}
