//! Core business logic - framework-agnostic bookkeeping operations.
//!
//! Every user-facing operation takes the already-authenticated [`UserId`] explicitly and
//! scopes all lookups by `(id, owner)`. Money movement goes through [`balance`], always
//! inside the same database transaction as the status change it belongs to.

pub mod balance;
pub mod bank;
pub mod bill;
pub mod category;
pub mod expense;
pub mod extra_income;
pub mod identity;
pub mod receivable;
pub mod user;
pub mod vault;

pub use identity::{IdentityProvider, UserId};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

use crate::errors::{Error, Result};

/// Current calendar day in UTC, the reference date for due-date rules.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Rejects due dates strictly before `today`.
pub(crate) fn ensure_not_past(due_date: NaiveDate, today: NaiveDate) -> Result<()> {
    if due_date < today {
        return Err(Error::invalid(format!(
            "Due date {due_date} is in the past"
        )));
    }
    Ok(())
}

/// Rejects zero and negative amounts.
pub(crate) fn ensure_positive(amount: Decimal, what: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid(format!(
            "{what} must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

/// Rejects empty or whitespace-only names, returning the trimmed value.
pub(crate) fn require_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(format!("{what} name cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Reports a unique-index violation as [`Error::InvalidOperation`] built from `message`.
/// Every other database error stays internal.
pub(crate) fn unique_violation_as_invalid(err: DbErr, message: impl FnOnce() -> String) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::invalid(message()),
        _ => err.into(),
    }
}

/// Outcome counters of one batch job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Records matched by the job's query
    pub examined: usize,
    /// Records the job transitioned
    pub processed: usize,
    /// Records left untouched on purpose (insufficient funds, no bank, already settled)
    pub skipped: usize,
    /// Records whose processing failed and was rolled back
    pub failed: usize,
}

/// Result of trying to settle one bill or receivable inside a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Status changed and the bank balance was moved in the same transaction
    Settled,
    /// Left untouched; the reason has been logged
    Skipped,
}

/// Zero-based page selection for paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page index, starting at 0
    pub page: u64,
    /// Items per page, clamped to `1..=100`
    pub size: u64,
}

impl PageRequest {
    /// Largest accepted page size
    pub const MAX_SIZE: u64 = 100;

    /// Builds a request, clamping the size into the accepted range.
    #[must_use]
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Page index that was requested
    pub page: u64,
    /// Page size that was applied
    pub size: u64,
    /// Number of matching items across all pages
    pub total_items: u64,
    /// Number of pages
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ensure_not_past() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(ensure_not_past(today, today).is_ok());
        assert!(ensure_not_past(today.succ_opt().unwrap(), today).is_ok());
        assert!(matches!(
            ensure_not_past(today.pred_opt().unwrap(), today),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive(dec!(0.01), "Amount").is_ok());
        assert!(ensure_positive(Decimal::ZERO, "Amount").is_err());
        assert!(ensure_positive(dec!(-5.00), "Amount").is_err());
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(0, 0).size, 1);
        assert_eq!(PageRequest::new(3, 500).size, PageRequest::MAX_SIZE);
        assert_eq!(PageRequest::default(), PageRequest::new(0, 20));
    }
}
