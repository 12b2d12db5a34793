use crate::services::SettlementService;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Runs the settlement sweep at 00:00 on the first day of every month
pub struct SettlementScheduler {
    service: Arc<SettlementService>,
    offset: FixedOffset,
}

/// Next local midnight on the 1st of a month strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset).date_naive();
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(local);
    let local_midnight = first.and_time(chrono::NaiveTime::MIN);

    local_midnight.and_utc() - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

impl SettlementScheduler {
    pub fn new(service: Arc<SettlementService>) -> Self {
        let offset = service.config().offset();
        Self { service, offset }
    }

    /// Sleep until each cut-off and run the sweep; never returns
    pub async fn start(self) {
        info!("Settlement scheduler started (UTC offset {})", self.offset);

        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.offset);
            info!("Next settlement sweep at {}", next.with_timezone(&self.offset));

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            time::sleep(wait).await;

            match self.service.run_monthly_settlement().await {
                Ok(report) => info!(
                    "Scheduled settlement for {} created {} row(s)",
                    report.period, report.settlements_created
                ),
                Err(e) => error!("Scheduled settlement failed: {}", e),
            }
        }
    }
}
