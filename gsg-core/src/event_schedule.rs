//! Current-event schedule merging
//!
//! Turns the event → raid-train → segment tree into placeholder stream
//! records for whoever is scheduled right now, and keeps the cached schedule
//! plus the refetch clock between polls.

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use std::time::Duration;

use gsg_providers::types::UNKNOWN_VIEWER_COUNT;
use gsg_providers::{CurrentEvent, StreamRecord};

/// Category every event placeholder is filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCategory {
    pub id: String,
    pub name: String,
}

impl From<&crate::config::StreamsConfig> for EventCategory {
    fn from(config: &crate::config::StreamsConfig) -> Self {
        Self {
            id: config.restricted_category_id.clone(),
            name: config.restricted_category_name.clone(),
        }
    }
}

/// True once `min_interval` has passed since the last attempt.
///
/// A schedule that was never fetched is always due.
#[must_use]
pub fn should_refetch(
    last_attempt: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_interval: Duration,
) -> bool {
    let Some(last) = last_attempt else {
        return true;
    };
    let Ok(interval) = chrono::Duration::from_std(min_interval) else {
        return false;
    };
    last.checked_add_signed(interval).is_some_and(|due| now >= due)
}

/// Placeholder records for every segment on air at `now`, keyed by login.
///
/// Nothing is emitted when the event itself is not running. Later segments
/// for the same login overwrite earlier ones.
#[must_use]
pub fn materialize(
    event: &CurrentEvent,
    now: DateTime<Utc>,
    category: &EventCategory,
) -> IndexMap<String, StreamRecord> {
    let mut active = IndexMap::new();
    let now_secs = now.timestamp();

    if !event.is_active_at(now_secs) {
        return active;
    }

    for (train_index, train) in event.raid_trains.iter().enumerate() {
        for slot in &train.schedule {
            let login = slot.twitch_name.trim().to_lowercase();
            if login.is_empty() || !slot.is_active_at(now_secs) {
                continue;
            }

            let record = StreamRecord {
                user_login: login.clone(),
                user_name: slot.twitch_name.trim().to_string(),
                title: event.title.clone(),
                game_id: category.id.clone(),
                game_name: category.name.clone(),
                viewer_count: UNKNOWN_VIEWER_COUNT,
                started_at: Utc.timestamp_opt(slot.start, 0).single(),
                thumbnail_url: slot.avatar_url.clone(),
                is_event_stream: true,
                is_normal_stream: false,
                raid_train_index: i32::try_from(train_index).unwrap_or(i32::MAX),
                ..StreamRecord::default()
            };
            active.insert(login, record);
        }
    }

    active
}

/// Cached schedule and refetch clock carried across polls
#[derive(Debug, Clone, Default)]
pub struct EventScheduleState {
    schedule: Option<CurrentEvent>,
    last_attempt: Option<DateTime<Utc>>,
}

impl EventScheduleState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>, min_interval: Duration) -> bool {
        should_refetch(self.last_attempt, now, min_interval)
    }

    /// Start the interval clock for an attempt made at `now`
    pub fn record_attempt(&mut self, now: DateTime<Utc>) {
        self.last_attempt = Some(now);
    }

    pub fn store(&mut self, schedule: CurrentEvent) {
        self.schedule = Some(schedule);
    }

    /// Drop the cached schedule and the clock so the next enable refetches at once
    pub fn reset(&mut self) {
        self.schedule = None;
        self.last_attempt = None;
    }

    #[must_use]
    pub const fn schedule(&self) -> Option<&CurrentEvent> {
        self.schedule.as_ref()
    }

    #[must_use]
    pub const fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.last_attempt
    }

    /// Placeholders for the cached schedule, empty when nothing is cached
    #[must_use]
    pub fn active_streams(
        &self,
        now: DateTime<Utc>,
        category: &EventCategory,
    ) -> IndexMap<String, StreamRecord> {
        self.schedule
            .as_ref()
            .map(|event| materialize(event, now, category))
            .unwrap_or_default()
    }
}
