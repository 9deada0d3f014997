//! Background scheduler for the daily bill and receivable jobs.
//!
//! Two loops run once per UTC day: the overdue sweeps at `overdue_at`, then auto-pay and
//! auto-receipt at `settlement_at`. A failing job is logged and the loop waits for the next day.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::{task::JoinHandle, time::Duration};
use tracing::{error, info};

use crate::{
    config::SchedulerConfig,
    core::{JobReport, bill, receivable, today},
    errors::Result,
};

/// Outcome of one job inside a daily run. `report` is `None` when the job itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobRun {
    /// Job name, e.g. `"overdue_bills"`
    pub job: &'static str,
    /// Counters of the run
    pub report: Option<JobReport>,
}

fn record(job: &'static str, outcome: Result<JobReport>) -> JobRun {
    match outcome {
        Ok(report) => {
            info!(job, ?report, "Scheduled job finished");
            JobRun {
                job,
                report: Some(report),
            }
        }
        Err(e) => {
            error!(job, "Scheduled job failed: {e}");
            JobRun { job, report: None }
        }
    }
}

/// Marks past-due bills and receivables as OVERDUE.
pub async fn run_overdue_jobs(db: &DatabaseConnection, today: NaiveDate) -> Vec<JobRun> {
    vec![
        record(
            "overdue_bills",
            bill::process_overdue_bills_as_of(db, today).await,
        ),
        record(
            "overdue_receivables",
            receivable::process_overdue_receivables_as_of(db, today).await,
        ),
    ]
}

/// Settles auto-pay bills and automatic receivables.
pub async fn run_settlement_jobs(db: &DatabaseConnection, today: NaiveDate) -> Vec<JobRun> {
    vec![
        record(
            "auto_pay_bills",
            bill::process_auto_pay_bills_as_of(db, today).await,
        ),
        record(
            "auto_receipts",
            receivable::process_auto_receipts_as_of(db, today).await,
        ),
    ]
}

/// Runs every daily job for `today`, overdue sweeps first.
pub async fn run_daily_jobs(db: &DatabaseConnection, today: NaiveDate) -> Vec<JobRun> {
    let mut runs = run_overdue_jobs(db, today).await;
    runs.extend(run_settlement_jobs(db, today).await);
    runs
}

/// Time left from `now` until the next occurrence of `at` (UTC). Zero never comes back:
/// if `now` is exactly `at`, the next run is tomorrow.
#[must_use]
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let date = now.date_naive();
    let mut next = date.and_time(at).and_utc();
    if next <= now {
        next = date
            .checked_add_days(Days::new(1))
            .unwrap_or(date)
            .and_time(at)
            .and_utc();
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

fn spawn_daily<F, Fut>(
    name: &'static str,
    at: NaiveTime,
    db: Arc<DatabaseConnection>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<DatabaseConnection>, NaiveDate) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<JobRun>> + Send,
{
    tokio::spawn(async move {
        info!(name, %at, "Daily job scheduled");
        loop {
            tokio::time::sleep(until_next(Utc::now(), at)).await;
            info!(name, "Running daily job");
            job(Arc::clone(&db), today()).await;
        }
    })
}

/// Starts both daily loops. Abort the returned handles to stop them.
pub fn start_daily_jobs(
    db: &Arc<DatabaseConnection>,
    config: &SchedulerConfig,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_daily(
            "overdue",
            config.overdue_at,
            Arc::clone(db),
            |db, today| async move { run_overdue_jobs(&db, today).await },
        ),
        spawn_daily(
            "settlement",
            config.settlement_at,
            Arc::clone(db),
            |db, today| async move { run_settlement_jobs(&db, today).await },
        ),
    ]
}
