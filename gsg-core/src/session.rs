//! Multi-stream session: polling and reconciliation pipeline.
//!
//! One session owns the stream map, the cached event schedule and the view
//! settings. `poll` is the only writer of the map; display and layout reads
//! take a read lock and always see a fully reconciled state.
//!
//! Polls may overlap when driven from more than one place. Each poll takes a
//! generation number when it starts and its result is dropped if a newer
//! generation has already been applied.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gsg_providers::types::NO_RAID_TRAIN;
use gsg_providers::StreamRecord;

use crate::config::{Config, LayoutConfig};
use crate::event_schedule::{EventCategory, EventScheduleState};
use crate::layout::{self, LayoutGeometry, Viewport};
use crate::source::StreamSource;
use crate::streams::{OrderedStreamMap, StreamPolicy};
use crate::view::ViewSettings;
use crate::{Error, Result};

/// What a single poll did to the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The map was reconciled against `streams` records
    Applied { generation: u64, streams: usize },
    /// Upstream failed or returned unusable data; the map is untouched
    Skipped { generation: u64 },
    /// A newer poll finished first; this result was discarded
    Stale { generation: u64 },
}

/// Derived, ordered list of streams to show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayList {
    pub streams: Vec<StreamRecord>,
    /// False until the first successful reconcile; an empty list is only
    /// definitive once this is set
    pub loaded: bool,
}

impl DisplayList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Runtime-tunable session settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub stream_interval: Duration,
    pub event_min_interval: Duration,
    pub use_current_event_data: bool,
    pub test_mode: bool,
    pub test_streams: Vec<String>,
    pub view: ViewSettings,
    pub layout: LayoutConfig,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            stream_interval: config.polling.stream_interval(),
            event_min_interval: config.polling.event_min_interval(),
            use_current_event_data: config.streams.use_current_event_data,
            test_mode: config.streams.test_mode,
            test_streams: config.streams.test_streams.clone(),
            view: ViewSettings::from(&config.view),
            layout: config.layout.clone(),
        }
    }
}

pub struct MultiStreamSession {
    source: Arc<dyn StreamSource>,
    streams: RwLock<OrderedStreamMap>,
    events: Mutex<EventScheduleState>,
    settings: RwLock<SessionSettings>,
    event_category: EventCategory,
    loaded: AtomicBool,
    next_generation: AtomicU64,
    /// Only written while the `streams` write lock is held
    applied_generation: AtomicU64,
}

impl MultiStreamSession {
    /// Create a session reading from `source`
    pub fn new(config: &Config, source: Arc<dyn StreamSource>) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| Error::InvalidInput(errors.join("; ")))?;

        Ok(Self {
            source,
            streams: RwLock::new(OrderedStreamMap::new(StreamPolicy::from(&config.streams))),
            events: Mutex::new(EventScheduleState::new()),
            settings: RwLock::new(SessionSettings::from(config)),
            event_category: EventCategory::from(&config.streams),
            loaded: AtomicBool::new(false),
            next_generation: AtomicU64::new(0),
            applied_generation: AtomicU64::new(0),
        })
    }

    /// Run one poll cycle against the current wall clock
    pub async fn poll(&self) -> PollOutcome {
        self.poll_at(Utc::now()).await
    }

    /// Run one poll cycle as if the time were `now`.
    ///
    /// Upstream failures are logged and reported as [`PollOutcome::Skipped`];
    /// they never reach the caller as errors.
    pub async fn poll_at(&self, now: DateTime<Utc>) -> PollOutcome {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (test_mode, test_streams, use_events, event_min_interval) = {
            let settings = self.settings.read();
            (
                settings.test_mode,
                settings.test_streams.clone(),
                settings.use_current_event_data,
                settings.event_min_interval,
            )
        };

        if test_mode {
            let records = test_streams
                .iter()
                .filter(|login| !login.is_empty())
                .map(|login| StreamRecord {
                    is_normal_stream: true,
                    ..StreamRecord::with_login(login.as_str())
                })
                .collect::<Vec<_>>();
            return self.apply(generation, &records);
        }

        let mut pending = IndexMap::new();
        if use_events {
            self.refresh_events(now, event_min_interval).await;
            pending = self.events.lock().active_streams(now, &self.event_category);
        }

        let feed = match self.source.public_streams().await {
            Ok(feed) => feed,
            Err(e) => {
                warn!(generation, error = %e, "Stream feed unavailable, keeping previous streams");
                return PollOutcome::Skipped { generation };
            }
        };

        merge_feed(&mut pending, feed);
        let records: Vec<StreamRecord> = pending.into_values().collect();
        self.apply(generation, &records)
    }

    /// Refetch the event schedule when the minimum interval has passed.
    ///
    /// The attempt time is recorded before the request, so a failed fetch
    /// waits a full interval before the next try. The cached schedule is
    /// only replaced on success.
    async fn refresh_events(&self, now: DateTime<Utc>, min_interval: Duration) {
        {
            let mut events = self.events.lock();
            if !events.is_due(now, min_interval) {
                return;
            }
            events.record_attempt(now);
        }

        match self.source.current_event().await {
            Ok(event) => {
                debug!(title = %event.title, trains = event.raid_trains.len(), "Event schedule refreshed");
                let mut events = self.events.lock();
                // disabled while the request was in flight
                if events.last_attempt().is_some() {
                    events.store(event);
                }
            }
            Err(e) => warn!(error = %e, "Event schedule unavailable, keeping cached schedule"),
        }
    }

    fn apply(&self, generation: u64, records: &[StreamRecord]) -> PollOutcome {
        let mut streams = self.streams.write();
        let applied = self.applied_generation.load(Ordering::SeqCst);
        if generation <= applied {
            debug!(generation, applied, "Discarding stale poll result");
            return PollOutcome::Stale { generation };
        }

        streams.reconcile(records);
        self.applied_generation.store(generation, Ordering::SeqCst);
        let visible = streams.len();
        drop(streams);

        self.loaded.store(true, Ordering::SeqCst);
        debug!(generation, received = records.len(), visible, "Streams reconciled");
        PollOutcome::Applied {
            generation,
            streams: records.len(),
        }
    }

    /// Poll every `stream_interval` until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.settings.read().stream_interval;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = period.as_secs(), "Stream polling started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Stream polling stopped");
                    return;
                }
                _ = interval.tick() => {
                    let outcome = self.poll().await;
                    debug!(?outcome, "Poll finished");
                }
            }
        }
    }

    #[must_use]
    pub fn streams_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Filtered and sorted streams from a consistent snapshot of the map
    #[must_use]
    pub fn display_list(&self) -> DisplayList {
        let view = self.settings.read().view.clone();
        let streams = {
            let map = self.streams.read();
            view.apply(map.iter())
        };
        DisplayList {
            streams,
            loaded: self.streams_loaded(),
        }
    }

    /// Grid geometry for the current display list and configured viewport
    #[must_use]
    pub fn layout(&self) -> LayoutGeometry {
        let count = self.display_list().len();
        self.layout_for(count)
    }

    /// Grid geometry for `count` tiles in the configured viewport
    #[must_use]
    pub fn layout_for(&self, count: usize) -> LayoutGeometry {
        let layout = self.settings.read().layout.clone();
        let decoration = if layout.hide_decor { 0.0 } else { layout.decoration_height };
        let viewport = Viewport::new(layout.viewport_width, layout.viewport_height, decoration);

        let mut geometry = layout::solve(count, &viewport);
        if !layout.centre_frames {
            geometry.top_padding = 0.0;
        }
        geometry
    }

    /// Record a viewport resize
    pub fn set_viewport(&self, width: f64, height: f64) {
        let mut settings = self.settings.write();
        settings.layout.viewport_width = width;
        settings.layout.viewport_height = height;
    }

    pub fn set_view(&self, view: ViewSettings) {
        self.settings.write().view = view;
    }

    pub fn set_hide_house_channel(&self, hide: bool) -> bool {
        self.streams.write().set_hide_house_channel(hide)
    }

    pub fn toggle_hide_house_channel(&self) -> bool {
        self.streams.write().toggle_hide_house_channel()
    }

    #[must_use]
    pub fn is_hiding_house_channel(&self) -> bool {
        self.streams.read().is_hiding_house_channel()
    }

    /// Toggle the category restriction, returning the records set aside
    pub fn set_restrict_to_category(&self, restrict: bool) -> Vec<StreamRecord> {
        self.streams
            .write()
            .set_restrict_to_category(restrict)
            .values()
            .cloned()
            .collect()
    }

    /// Turn event schedule merging on or off. Turning it off drops the cached
    /// schedule so re-enabling fetches a fresh one on the next poll.
    pub fn set_use_current_event_data(&self, enabled: bool) {
        self.settings.write().use_current_event_data = enabled;
        if !enabled {
            self.events.lock().reset();
        }
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.settings.write().test_mode = enabled;
    }

    /// Read access to the map for callers that need more than the display list
    pub fn with_streams<R>(&self, f: impl FnOnce(&OrderedStreamMap) -> R) -> R {
        f(&self.streams.read())
    }
}

/// Fold the raw feed into the event placeholders.
///
/// Feed entries are visited oldest first. An entry whose login has an event
/// placeholder inherits its event flags; every feed entry is marked as a
/// normal stream and replaces the placeholder's other fields.
pub fn merge_feed(pending: &mut IndexMap<String, StreamRecord>, mut feed: Vec<StreamRecord>) {
    feed.sort_by(|a, b| a.started_at.cmp(&b.started_at));

    for mut stream in feed {
        if stream.user_login.is_empty() {
            continue;
        }

        if let Some(event) = pending.get(&stream.user_login) {
            stream.is_event_stream = event.is_event_stream;
            stream.raid_train_index = event.raid_train_index;
        } else {
            stream.is_event_stream = false;
            stream.raid_train_index = NO_RAID_TRAIN;
        }
        stream.is_normal_stream = true;

        pending.insert(stream.user_login.clone(), stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockStreamSource;
    use chrono::TimeZone;
    use gsg_providers::{CurrentEvent, ProviderClientError, RaidTrain, ScheduleSlot, StatusCode};

    const HOUSE: &str = "goldenshrimpguild";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.streams.hide_house_channel = false;
        config
    }

    fn live(login: &str, started: i64) -> StreamRecord {
        StreamRecord {
            title: format!("{login} live"),
            game_id: "26936".to_string(),
            viewer_count: 10,
            started_at: Some(at(started)),
            ..StreamRecord::with_login(login)
        }
    }

    fn event_with(login: &str) -> CurrentEvent {
        CurrentEvent {
            title: "Shrimp Fest".to_string(),
            start: 1_000,
            end: 10_000,
            raid_trains: vec![
                RaidTrain { start: 1_000, end: 10_000, schedule: vec![] },
                RaidTrain {
                    start: 1_000,
                    end: 10_000,
                    schedule: vec![ScheduleSlot {
                        start: 1_000,
                        end: 5_000,
                        twitch_name: login.to_string(),
                        avatar_url: String::new(),
                    }],
                },
            ],
        }
    }

    fn session(config: &Config, source: MockStreamSource) -> MultiStreamSession {
        MultiStreamSession::new(config, Arc::new(source)).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.api.base_url = String::new();
        let result = MultiStreamSession::new(&config, Arc::new(MockStreamSource::new()));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_event_entry_takes_precedence_in_merge() {
        let mut source = MockStreamSource::new();
        source
            .expect_current_event()
            .times(1)
            .returning(|| Ok(event_with("abc")));
        source
            .expect_public_streams()
            .returning(|| Ok(vec![live("abc", 1_200), live("def", 1_100)]));

        let session = session(&config(), source);
        let outcome = session.poll_at(at(2_000)).await;
        assert!(matches!(outcome, PollOutcome::Applied { streams: 2, .. }));

        session.with_streams(|map| {
            let abc = map.get("abc").unwrap();
            assert!(abc.is_event_stream);
            assert!(abc.is_normal_stream);
            assert!(abc.raid_train_index >= 0);
            assert_eq!(abc.raid_train_index, 1);
            // feed data wins for everything but the flags
            assert_eq!(abc.viewer_count, 10);
            assert_eq!(abc.title, "abc live");

            let def = map.get("def").unwrap();
            assert!(!def.is_event_stream);
            assert!(def.is_normal_stream);
            assert_eq!(def.raid_train_index, NO_RAID_TRAIN);
        });

        let display = session.display_list();
        assert!(display.loaded);
        assert_eq!(display.streams[0].user_login, "abc");
    }

    #[tokio::test]
    async fn test_event_only_placeholder_is_kept() {
        let mut source = MockStreamSource::new();
        source.expect_current_event().returning(|| Ok(event_with("offline_dj")));
        source.expect_public_streams().returning(|| Ok(vec![live("def", 1_100)]));

        let session = session(&config(), source);
        session.poll_at(at(2_000)).await;

        session.with_streams(|map| {
            let dj = map.get("offline_dj").unwrap();
            assert!(dj.is_event_stream);
            assert!(!dj.is_normal_stream);
            assert_eq!(dj.viewer_count, -1);
        });
    }

    #[tokio::test]
    async fn test_failed_feed_leaves_map_unchanged() {
        let mut source = MockStreamSource::new();
        source.expect_current_event().returning(|| {
            Err(ProviderClientError::Network("connection refused".to_string()))
        });
        let mut calls = 0;
        source.expect_public_streams().returning(move || {
            calls += 1;
            match calls {
                1 => Ok(vec![live("abc", 100), live("def", 200)]),
                2 => Err(ProviderClientError::Http {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    url: "https://api.example.com/public/stream".to_string(),
                }),
                _ => Err(ProviderClientError::MalformedPayload("no count".to_string())),
            }
        });

        let session = session(&config(), source);
        assert!(matches!(session.poll_at(at(2_000)).await, PollOutcome::Applied { .. }));
        let before = session.with_streams(OrderedStreamMap::clone);

        assert!(matches!(session.poll_at(at(2_060)).await, PollOutcome::Skipped { .. }));
        assert!(matches!(session.poll_at(at(2_120)).await, PollOutcome::Skipped { .. }));

        session.with_streams(|after| {
            assert_eq!(after.keys(), before.keys());
            assert_eq!(after.values(), before.values());
        });
        assert!(session.streams_loaded());
    }

    #[tokio::test]
    async fn test_not_loaded_until_first_success() {
        let mut source = MockStreamSource::new();
        source.expect_current_event().returning(|| Ok(CurrentEvent::default()));
        source
            .expect_public_streams()
            .returning(|| Err(ProviderClientError::Parse("eof".to_string())));

        let session = session(&config(), source);
        session.poll_at(at(2_000)).await;
        let display = session.display_list();
        assert!(display.is_empty());
        assert!(!display.loaded);
    }

    #[tokio::test]
    async fn test_event_schedule_respects_min_interval() {
        let mut source = MockStreamSource::new();
        source
            .expect_current_event()
            .times(2)
            .returning(|| Ok(event_with("abc")));
        source.expect_public_streams().returning(|| Ok(vec![]));

        let session = session(&config(), source);
        session.poll_at(at(2_000)).await;
        session.poll_at(at(2_060)).await;
        session.poll_at(at(2_599)).await;
        session.poll_at(at(2_600)).await;
    }

    #[tokio::test]
    async fn test_failed_event_fetch_keeps_cached_schedule() {
        let mut source = MockStreamSource::new();
        let mut calls = 0;
        source.expect_current_event().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(event_with("abc"))
            } else {
                Err(ProviderClientError::Network("timeout".to_string()))
            }
        });
        source.expect_public_streams().returning(|| Ok(vec![]));

        let session = session(&config(), source);
        session.poll_at(at(2_000)).await;
        session.poll_at(at(2_600)).await;

        session.with_streams(|map| assert!(map.get("abc").unwrap().is_event_stream));
    }

    #[tokio::test]
    async fn test_disabling_events_clears_schedule() {
        let mut source = MockStreamSource::new();
        source
            .expect_current_event()
            .times(2)
            .returning(|| Ok(event_with("abc")));
        source.expect_public_streams().returning(|| Ok(vec![]));

        let session = session(&config(), source);
        session.poll_at(at(2_000)).await;
        assert_eq!(session.display_list().len(), 1);

        session.set_use_current_event_data(false);
        session.poll_at(at(2_010)).await;
        assert!(session.display_list().is_empty());

        // re-enabling refetches at once, inside the old interval
        session.set_use_current_event_data(true);
        session.poll_at(at(2_020)).await;
        assert_eq!(session.display_list().len(), 1);
    }

    #[tokio::test]
    async fn test_test_mode_skips_network() {
        // no expectations: any upstream call panics
        let source = MockStreamSource::new();
        let mut config = config();
        config.streams.test_mode = true;
        config.streams.test_streams = vec!["litui".to_string(), HOUSE.to_string()];

        let session = session(&config, source);
        let outcome = session.poll_at(at(2_000)).await;
        assert_eq!(outcome, PollOutcome::Applied { generation: 1, streams: 2 });
        assert!(session.streams_loaded());
        assert_eq!(session.with_streams(OrderedStreamMap::keys), vec!["litui", HOUSE]);

        assert!(session.set_hide_house_channel(true));
        assert_eq!(session.with_streams(OrderedStreamMap::keys), vec!["litui"]);
        assert!(!session.toggle_hide_house_channel());
        assert!(!session.is_hiding_house_channel());
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let session = session(&config(), MockStreamSource::new());

        assert!(matches!(
            session.apply(2, &[live("newer", 100)]),
            PollOutcome::Applied { generation: 2, .. }
        ));
        assert_eq!(
            session.apply(1, &[live("older", 100)]),
            PollOutcome::Stale { generation: 1 }
        );
        assert_eq!(session.with_streams(OrderedStreamMap::keys), vec!["newer"]);
    }

    #[tokio::test]
    async fn test_restrict_to_category_through_session() {
        let mut config = config();
        config.streams.use_current_event_data = false;
        let mut source = MockStreamSource::new();
        source.expect_public_streams().returning(|| {
            let mut other = live("gamer", 100);
            other.game_id = "509658".to_string();
            Ok(vec![live("abc", 50), other])
        });

        let session = session(&config, source);
        session.poll_at(at(2_000)).await;

        let set_aside = session.set_restrict_to_category(true);
        assert_eq!(set_aside.len(), 1);
        assert_eq!(set_aside[0].user_login, "gamer");
        assert_eq!(session.display_list().len(), 1);

        assert!(session.set_restrict_to_category(false).is_empty());
        assert_eq!(session.display_list().len(), 2);
    }

    #[tokio::test]
    async fn test_layout_follows_display_list() {
        let mut config = config();
        config.streams.test_mode = true;
        config.layout = LayoutConfig {
            viewport_width: 1600.0,
            viewport_height: 900.0,
            decoration_height: 0.0,
            hide_decor: false,
            centre_frames: true,
        };
        config.streams.test_streams = vec!["a".into(), "b".into(), "c".into(), "d".into()];

        let session = session(&config, MockStreamSource::new());
        assert_eq!(session.layout().rows, 0);

        session.poll_at(at(2_000)).await;
        let geometry = session.layout();
        assert_eq!((geometry.columns, geometry.rows), (2, 2));
        assert!((geometry.tile_width - 800.0).abs() < 1e-9);

        session.set_viewport(1700.0, 1000.0);
        assert!(session.layout().top_padding > 0.0);
    }

    #[test]
    fn test_merge_feed_orders_by_start_time() {
        let mut pending = IndexMap::new();
        merge_feed(
            &mut pending,
            vec![live("late", 300), live("early", 100), live("", 50), live("mid", 200)],
        );
        assert_eq!(pending.keys().collect::<Vec<_>>(), vec!["early", "mid", "late"]);
        assert!(pending.values().all(|s| s.is_normal_stream && !s.is_event_stream));
    }
}
