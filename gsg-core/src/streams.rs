//! Ordered stream map
//!
//! Keyed by channel login, insertion ordered for deterministic iteration.
//! Two side stores back the visibility policies:
//! - the house channel slot, which keeps the last-seen house record even
//!   while it is hidden so it can be shown again without a refetch
//! - the off-category index, which holds records set aside while the
//!   category restriction is on

use indexmap::IndexMap;

use gsg_providers::StreamRecord;

/// Identity and category policy inputs for an [`OrderedStreamMap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPolicy {
    pub house_channel_login: String,
    pub hide_house_channel: bool,
    pub restrict_to_category: bool,
    pub restricted_category_id: String,
}

impl From<&crate::config::StreamsConfig> for StreamPolicy {
    fn from(config: &crate::config::StreamsConfig) -> Self {
        Self {
            house_channel_login: config.house_channel_login.clone(),
            hide_house_channel: config.hide_house_channel,
            restrict_to_category: config.restrict_to_category,
            restricted_category_id: config.restricted_category_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderedStreamMap {
    primary: IndexMap<String, StreamRecord>,
    house_record: Option<StreamRecord>,
    off_category: IndexMap<String, StreamRecord>,
    policy: StreamPolicy,
}

impl OrderedStreamMap {
    #[must_use]
    pub fn new(policy: StreamPolicy) -> Self {
        Self {
            primary: IndexMap::new(),
            house_record: None,
            off_category: IndexMap::new(),
            policy,
        }
    }

    /// Build a map and populate it from `streams`
    #[must_use]
    pub fn from_streams(policy: StreamPolicy, streams: impl IntoIterator<Item = StreamRecord>) -> Self {
        let mut map = Self::new(policy);
        for stream in streams {
            map.set_stream(stream);
        }
        map
    }

    fn is_house(&self, login: &str) -> bool {
        login == self.policy.house_channel_login
    }

    fn in_restricted_category(&self, record: &StreamRecord) -> bool {
        record.game_id == self.policy.restricted_category_id
    }

    /// Insert or overwrite `record` under `key`, applying the visibility policies.
    ///
    /// An empty key or an empty login is ignored.
    pub fn set(&mut self, key: &str, record: StreamRecord) -> &mut Self {
        if key.is_empty() || record.user_login.is_empty() {
            return self;
        }

        if self.is_house(&record.user_login) {
            self.house_record = Some(record.clone());
            if self.policy.hide_house_channel {
                return self;
            }
        }

        self.insert_visible(key.to_string(), record);
        self
    }

    /// [`Self::set`] keyed by the record's own login
    pub fn set_stream(&mut self, record: StreamRecord) -> &mut Self {
        let key = record.user_login.clone();
        self.set(&key, record)
    }

    /// Place a record that has passed the house-channel check.
    fn insert_visible(&mut self, key: String, record: StreamRecord) {
        if self.policy.restrict_to_category && !self.in_restricted_category(&record) {
            self.primary.shift_remove(&key);
            self.off_category.insert(key, record);
            return;
        }
        self.off_category.shift_remove(&key);
        self.primary.insert(key, record);
    }

    /// Bring the map in line with `latest`: drop keys that are gone, insert
    /// or overwrite everything present.
    pub fn reconcile(&mut self, latest: &[StreamRecord]) {
        let latest_logins: std::collections::HashSet<&str> =
            latest.iter().map(|s| s.user_login.as_str()).collect();

        self.primary.retain(|login, _| latest_logins.contains(login.as_str()));
        self.off_category.retain(|login, _| latest_logins.contains(login.as_str()));

        let house_gone = self
            .house_record
            .as_ref()
            .is_some_and(|house| !latest_logins.contains(house.user_login.as_str()));
        if house_gone {
            tracing::debug!(login = %self.policy.house_channel_login, "House channel left the feed");
            self.house_record = None;
        }

        for stream in latest {
            self.set_stream(stream.clone());
        }
    }

    /// Hide or show the house channel, returning the new state.
    pub fn set_hide_house_channel(&mut self, hide: bool) -> bool {
        self.policy.hide_house_channel = hide;
        if hide {
            let login = self.policy.house_channel_login.clone();
            self.primary.shift_remove(&login);
            self.off_category.shift_remove(&login);
        } else if let Some(house) = self.house_record.clone() {
            self.insert_visible(house.user_login.clone(), house);
        }
        self.policy.hide_house_channel
    }

    pub fn toggle_hide_house_channel(&mut self) -> bool {
        self.set_hide_house_channel(!self.policy.hide_house_channel)
    }

    #[must_use]
    pub const fn is_hiding_house_channel(&self) -> bool {
        self.policy.hide_house_channel
    }

    /// Turn the category restriction on or off and return the set-aside records.
    pub fn set_restrict_to_category(&mut self, restrict: bool) -> &IndexMap<String, StreamRecord> {
        self.policy.restrict_to_category = restrict;
        if restrict {
            let (keep, set_aside): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(&mut self.primary)
                .into_iter()
                .partition(|(_, record)| self.in_restricted_category(record));
            self.primary = keep;
            self.off_category.extend(set_aside);
        } else {
            let restored = std::mem::take(&mut self.off_category);
            self.primary.extend(restored);
        }
        &self.off_category
    }

    #[must_use]
    pub const fn is_restricting_to_category(&self) -> bool {
        self.policy.restrict_to_category
    }

    #[must_use]
    pub const fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    /// Last house channel record seen, whether or not it is visible
    #[must_use]
    pub const fn house_record(&self) -> Option<&StreamRecord> {
        self.house_record.as_ref()
    }

    #[must_use]
    pub fn get(&self, login: &str) -> Option<&StreamRecord> {
        self.primary.get(login)
    }

    #[must_use]
    pub fn contains_key(&self, login: &str) -> bool {
        self.primary.contains_key(login)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Snapshot of the visible logins
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.primary.keys().cloned().collect()
    }

    /// Snapshot of the visible records
    #[must_use]
    pub fn values(&self) -> Vec<StreamRecord> {
        self.primary.values().cloned().collect()
    }

    /// Borrowing iterator over visible records, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &StreamRecord> {
        self.primary.values()
    }

    /// The visible records as a map, for whole-state comparisons
    #[must_use]
    pub const fn as_map(&self) -> &IndexMap<String, StreamRecord> {
        &self.primary
    }
}
