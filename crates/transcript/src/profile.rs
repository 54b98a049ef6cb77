//! Deduplicated author table.

use std::collections::HashMap;

use {
    serde::{Deserialize, Serialize},
    skald_common::types::{Author, Snowflake},
};

/// Display data recorded for an author the first time they are seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub verified_bot: bool,
    #[serde(default)]
    pub system: bool,
}

impl From<&Author> for ProfileData {
    fn from(author: &Author) -> Self {
        Self {
            name: author.shown_name().to_string(),
            username: author.username.clone(),
            avatar_url: author.avatar_url.clone(),
            color: author.color,
            bot: author.bot,
            verified_bot: author.verified_bot,
            system: author.system,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub key: usize,
    pub id: Snowflake,
    #[serde(flatten)]
    pub data: ProfileData,
}

/// Assigns small integer keys to authors in first-seen order.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    entries: Vec<ProfileEntry>,
    index: HashMap<Snowflake, usize>,
}

impl ProfileRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for `author_id`, registering `data` if the author is new.
    /// Later registrations never overwrite the stored data.
    pub fn register(&mut self, author_id: Snowflake, data: ProfileData) -> usize {
        if let Some(&key) = self.index.get(&author_id) {
            return key;
        }
        let key = self.entries.len();
        self.entries.push(ProfileEntry {
            key,
            id: author_id,
            data,
        });
        self.index.insert(author_id, key);
        key
    }

    #[must_use]
    pub fn key_of(&self, author_id: Snowflake) -> Option<usize> {
        self.index.get(&author_id).copied()
    }

    #[must_use]
    pub fn get(&self, key: usize) -> Option<&ProfileEntry> {
        self.entries.get(key)
    }

    /// Entries ordered by key.
    #[must_use]
    pub fn export(&self) -> Vec<ProfileEntry> {
        self.entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str) -> ProfileData {
        ProfileData {
            name: name.into(),
            username: name.to_lowercase(),
            ..ProfileData::default()
        }
    }

    #[test]
    fn keys_follow_first_appearance() {
        let mut registry = ProfileRegistry::new();
        assert_eq!(registry.register(Snowflake(30), data("C")), 0);
        assert_eq!(registry.register(Snowflake(10), data("A")), 1);
        assert_eq!(registry.register(Snowflake(30), data("C")), 0);
        assert_eq!(registry.register(Snowflake(20), data("B")), 2);

        let ids: Vec<_> = registry.export().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Snowflake(30), Snowflake(10), Snowflake(20)]);
        assert_eq!(registry.key_of(Snowflake(20)), Some(2));
        assert_eq!(registry.key_of(Snowflake(99)), None);
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = ProfileRegistry::new();
        let first = registry.register(Snowflake(1), data("Ann"));
        let second = registry.register(Snowflake(1), data("Annie"));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(first).unwrap().data.name, "Ann");
    }

    #[test]
    fn entry_serializes_flat() {
        let mut registry = ProfileRegistry::new();
        registry.register(Snowflake(5), data("Bo"));
        let json = serde_json::to_value(&registry.export()[0]).unwrap();
        assert_eq!(json["key"], 0);
        assert_eq!(json["id"], "5");
        assert_eq!(json["name"], "Bo");
        assert!(json.get("avatar_url").is_none());
    }

    #[test]
    fn data_from_author_prefers_display_name() {
        let author = Author {
            id: Snowflake(1),
            username: "ann_99".into(),
            display_name: Some("Ann".into()),
            bot: true,
            ..Author::default()
        };
        let data = ProfileData::from(&author);
        assert_eq!(data.name, "Ann");
        assert_eq!(data.username, "ann_99");
        assert!(data.bot);
    }
}
