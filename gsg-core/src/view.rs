//! Display list derivation: keyword filtering and ordering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use gsg_providers::StreamRecord;

/// Which side wins when a title matches both an include and an exclude word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    IncludeWins,
    ExcludeWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    StartedAt,
    ViewerCount,
    UserName,
    UserLogin,
    Title,
    GameName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Filter and sort settings for one view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSettings {
    pub include_words: Vec<String>,
    pub exclude_words: Vec<String>,
    pub tie_break: TieBreak,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl From<&crate::config::ViewConfig> for ViewSettings {
    fn from(config: &crate::config::ViewConfig) -> Self {
        Self {
            include_words: config.include_words.clone(),
            exclude_words: config.exclude_words.clone(),
            tie_break: config.tie_break,
            sort_field: config.sort_field,
            sort_direction: config.sort_direction,
        }
    }
}

fn matches_any(title_lower: &str, words: &[String]) -> bool {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .any(|w| title_lower.contains(&w.to_lowercase()))
}

impl ViewSettings {
    /// Whether `record` survives the keyword filters. Event streams always do.
    #[must_use]
    pub fn keeps(&self, record: &StreamRecord) -> bool {
        if record.is_event_stream {
            return true;
        }

        let title = record.title.to_lowercase();
        let matched_include =
            self.include_words.is_empty() || matches_any(&title, &self.include_words);
        let matched_exclude = matches_any(&title, &self.exclude_words);

        match (matched_include, matched_exclude) {
            (false, _) => false,
            (true, false) => true,
            (true, true) => self.tie_break == TieBreak::IncludeWins,
        }
    }

    /// Event streams first, then the selected field in the selected direction.
    #[must_use]
    pub fn compare(&self, a: &StreamRecord, b: &StreamRecord) -> Ordering {
        let by_event = b.is_event_stream.cmp(&a.is_event_stream);
        let by_field = compare_field(self.sort_field, a, b);
        let by_field = match self.sort_direction {
            SortDirection::Ascending => by_field,
            SortDirection::Descending => by_field.reverse(),
        };
        by_event.then(by_field)
    }

    /// Filter then stable-sort `records`. Equal records keep their input order.
    #[must_use]
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a StreamRecord>) -> Vec<StreamRecord> {
        let mut kept: Vec<StreamRecord> = records
            .into_iter()
            .filter(|r| self.keeps(r))
            .cloned()
            .collect();
        kept.sort_by(|a, b| self.compare(a, b));
        kept
    }
}

fn compare_field(field: SortField, a: &StreamRecord, b: &StreamRecord) -> Ordering {
    match field {
        // records without a start time sort as oldest
        SortField::StartedAt => a.started_at.cmp(&b.started_at),
        SortField::ViewerCount => a.viewer_count.cmp(&b.viewer_count),
        SortField::UserName => a.user_name.to_lowercase().cmp(&b.user_name.to_lowercase()),
        SortField::UserLogin => a.user_login.cmp(&b.user_login),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::GameName => a.game_name.to_lowercase().cmp(&b.game_name.to_lowercase()),
    }
}
