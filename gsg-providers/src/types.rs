//! GSG HTTP API Types
//!
//! Wire types for the public stream feed and the current-event schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raid-train index carried by records that did not come from an event schedule.
pub const NO_RAID_TRAIN: i32 = -1;

/// Viewer count for records whose audience size is unknown (event placeholders).
pub const UNKNOWN_VIEWER_COUNT: i64 = -1;

/// One live stream as published by `/public/stream`.
///
/// The three trailing flags are never sent by the feed; they are derived by
/// the reconciliation pipeline and default to "plain feed record, not yet
/// classified".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_login: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub game_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub game_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub viewer_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_mature: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(rename = "isEventStream")]
    pub is_event_stream: bool,
    #[serde(rename = "isNormalStream")]
    pub is_normal_stream: bool,
    #[serde(rename = "raidTrainIndex")]
    pub raid_train_index: i32,
}

impl Default for StreamRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            user_id: String::new(),
            user_login: String::new(),
            user_name: String::new(),
            game_id: String::new(),
            game_name: String::new(),
            title: String::new(),
            viewer_count: 0,
            started_at: None,
            language: String::new(),
            thumbnail_url: String::new(),
            is_mature: false,
            tags: Vec::new(),
            is_event_stream: false,
            is_normal_stream: false,
            raid_train_index: NO_RAID_TRAIN,
        }
    }
}

impl StreamRecord {
    /// Minimal record carrying only a login and display name.
    #[must_use]
    pub fn with_login(login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            user_name: login.clone(),
            user_login: login,
            ..Self::default()
        }
    }
}

/// Treat an explicit `null` like a missing field.
///
/// The feed is produced by a Go service that serializes nil slices and unset
/// pointers as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope returned by `GET /public/stream`.
///
/// Both fields are optional on the wire so that a response missing either of
/// them can be told apart from a genuinely empty feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedResponse {
    pub count: Option<u64>,
    pub data: Option<Vec<StreamRecord>>,
}

impl FeedResponse {
    /// Unwrap the stream list, rejecting envelopes without `count` or `data`.
    pub fn into_records(self) -> Result<Vec<StreamRecord>, crate::ProviderClientError> {
        match (self.count, self.data) {
            (Some(_), Some(data)) => Ok(data),
            (None, _) => Err(crate::ProviderClientError::MalformedPayload(
                "feed response has no count".to_string(),
            )),
            (_, None) => Err(crate::ProviderClientError::MalformedPayload(
                "feed response has no data".to_string(),
            )),
        }
    }
}

/// Current event returned by `GET /event/current`. Times are unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentEvent {
    #[serde(default)]
    pub title: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub raid_trains: Vec<RaidTrain>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidTrain {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

/// A single programmed segment within a raid-train.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub twitch_name: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Inclusive `[start, end]` window check shared by the event and its segments.
fn window_contains(start: i64, end: i64, now: i64) -> bool {
    start <= now && now <= end
}

impl CurrentEvent {
    #[must_use]
    pub fn is_active_at(&self, now: i64) -> bool {
        window_contains(self.start, self.end, now)
    }
}

impl ScheduleSlot {
    #[must_use]
    pub fn is_active_at(&self, now: i64) -> bool {
        window_contains(self.start, self.end, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_record_defaults_missing_fields() {
        let record: StreamRecord =
            serde_json::from_str(r#"{"user_login":"litui","title":"Jazz night"}"#).unwrap();
        assert_eq!(record.user_login, "litui");
        assert_eq!(record.title, "Jazz night");
        assert!(record.started_at.is_none());
        assert!(!record.is_event_stream);
        assert_eq!(record.raid_train_index, NO_RAID_TRAIN);
    }

    #[test]
    fn test_stream_record_parses_started_at() {
        let record: StreamRecord = serde_json::from_str(
            r#"{"user_login":"a","started_at":"2024-03-01T18:30:00Z","viewer_count":12}"#,
        )
        .unwrap();
        assert_eq!(record.viewer_count, 12);
        assert_eq!(
            record.started_at.map(|t| t.timestamp()),
            Some(1_709_317_800)
        );
    }

    #[test]
    fn test_stream_record_accepts_null_fields() {
        let feed: FeedResponse = serde_json::from_str(
            r#"{"count":2,"data":[
                {"user_login":"a","tags":null,"game_name":null,"viewer_count":null,"started_at":null},
                {"user_login":"b","tags":["x"]}
            ]}"#,
        )
        .unwrap();
        let records = feed.into_records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].tags.is_empty());
        assert_eq!(records[0].game_name, "");
        assert_eq!(records[0].viewer_count, 0);
        assert!(records[0].started_at.is_none());
        assert_eq!(records[0].raid_train_index, NO_RAID_TRAIN);
        assert_eq!(records[1].tags, vec!["x"]);
    }

    #[test]
    fn test_feed_response_requires_count_and_data() {
        let ok: FeedResponse = serde_json::from_str(r#"{"count":0,"data":[]}"#).unwrap();
        assert!(ok.into_records().unwrap().is_empty());

        let no_count: FeedResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(no_count.into_records().is_err());

        let no_data: FeedResponse = serde_json::from_str(r#"{"count":3}"#).unwrap();
        assert!(no_data.into_records().is_err());
    }

    #[test]
    fn test_current_event_camel_case() {
        let event: CurrentEvent = serde_json::from_str(
            r#"{
                "title": "Shrimp Fest",
                "start": 100,
                "end": 200,
                "raidTrains": [
                    {"start": 100, "end": 150, "schedule": [
                        {"start": 100, "end": 120, "twitchName": "litui", "avatarUrl": "https://img/a.png"}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(event.raid_trains.len(), 1);
        assert_eq!(event.raid_trains[0].schedule[0].twitch_name, "litui");
        assert!(event.is_active_at(100));
        assert!(event.is_active_at(200));
        assert!(!event.is_active_at(201));
    }
}
