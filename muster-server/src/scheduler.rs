//! Notification scheduler
//!
//! Two fixed wall-clock triggers in one named time zone:
//! - Sunday through Thursday at 22:30
//! - Saturday and Sunday at 02:00
//!
//! Each firing builds the report from the backend's current scan log and
//! pushes it to every registered subscription.

use crate::push::{deliver, DeliverySummary, PushPayload, PushSender};
use crate::store::BackendStore;
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One wall-clock trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub label: &'static str,
    pub days: &'static [Weekday],
    pub hour: u32,
    pub minute: u32,
}

pub const WEEKNIGHT_TRIGGER: Trigger = Trigger {
    label: "sun-thu 22:30",
    days: &[Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
    hour: 22,
    minute: 30,
};

pub const WEEKEND_TRIGGER: Trigger = Trigger {
    label: "sat-sun 02:00",
    days: &[Weekday::Sat, Weekday::Sun],
    hour: 2,
    minute: 0,
};

pub const DEFAULT_TRIGGERS: [Trigger; 2] = [WEEKNIGHT_TRIGGER, WEEKEND_TRIGGER];

impl Trigger {
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// First firing strictly after `after`, evaluated in `tz`
    ///
    /// A wall-clock time skipped by a DST change fires at the first instant
    /// after the gap; a repeated one fires on its first occurrence.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local_date = after.with_timezone(&tz).date_naive();

        // A week plus one day always covers the next matching weekday
        (0..=7)
            .map(|offset| local_date + Duration::days(offset))
            .filter(|date| self.runs_on(date.weekday()))
            .filter_map(|date| date.and_hms_opt(self.hour, self.minute, 0))
            .filter_map(|naive| resolve_local(tz, naive))
            .find(|instant| *instant > after)
    }
}

fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    let resolved = tz
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())?;
    Some(resolved.with_timezone(&Utc))
}

/// Fires the report notification at the configured triggers
pub struct NotificationScheduler {
    store: Arc<BackendStore>,
    sender: Arc<dyn PushSender>,
    timezone: Tz,
    triggers: Vec<Trigger>,
}

impl NotificationScheduler {
    pub fn new(store: Arc<BackendStore>, sender: Arc<dyn PushSender>, timezone: Tz) -> Self {
        Self {
            store,
            sender,
            timezone,
            triggers: DEFAULT_TRIGGERS.to_vec(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Earliest trigger firing strictly after `after`
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<(Trigger, DateTime<Utc>)> {
        self.triggers
            .iter()
            .filter_map(|trigger| {
                trigger
                    .next_after(after, self.timezone)
                    .map(|at| (*trigger, at))
            })
            .min_by_key(|(_, at)| *at)
    }

    /// Build the report and push it to every subscriber
    pub async fn fire(&self, trigger: &Trigger) -> DeliverySummary {
        let report = self.store.report().await;
        let message = report.message();
        let subscribers = self.store.subscribers().await;

        info!(
            trigger = trigger.label,
            subscribers = subscribers.len(),
            "Sending push notification to all subscribers..."
        );

        let summary = deliver(self.sender.as_ref(), &subscribers, &PushPayload::report(message)).await;
        if !summary.failed.is_empty() {
            warn!(
                trigger = trigger.label,
                delivered = summary.delivered,
                failed = summary.failed.len(),
                "Report delivery incomplete"
            );
        }
        summary
    }

    /// Sleep until each firing and run it, until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut after = Utc::now();

        loop {
            let Some((trigger, at)) = self.next_fire(after) else {
                warn!("No upcoming trigger, notification scheduler stopping");
                return;
            };
            info!(
                trigger = trigger.label,
                "Next report at {} ({})",
                at.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M %Z"),
                at
            );

            let wait = (at - Utc::now()).to_std().unwrap_or_default();
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Notification scheduler stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.fire(&trigger).await;
            after = at;
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
