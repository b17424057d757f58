use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed set of platforms the planner tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "fb")]
    Facebook,
    #[serde(rename = "ig")]
    Instagram,
    #[serde(rename = "wa")]
    WhatsApp,
    #[serde(rename = "olx")]
    Olx,
    #[serde(rename = "tt")]
    TikTok,
    #[serde(rename = "ge")]
    GoogleBusiness,
}

impl ChannelKind {
    /// Display order used by the template and the channel bar
    pub const ALL: [ChannelKind; 6] = [
        ChannelKind::Facebook,
        ChannelKind::Instagram,
        ChannelKind::WhatsApp,
        ChannelKind::Olx,
        ChannelKind::TikTok,
        ChannelKind::GoogleBusiness,
    ];

    /// Short id used in storage and on the wire
    pub fn id(self) -> &'static str {
        match self {
            ChannelKind::Facebook => "fb",
            ChannelKind::Instagram => "ig",
            ChannelKind::WhatsApp => "wa",
            ChannelKind::Olx => "olx",
            ChannelKind::TikTok => "tt",
            ChannelKind::GoogleBusiness => "ge",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Facebook => "Facebook",
            ChannelKind::Instagram => "Instagram",
            ChannelKind::WhatsApp => "WhatsApp",
            ChannelKind::Olx => "OLX",
            ChannelKind::TikTok => "TikTok",
            ChannelKind::GoogleBusiness => "Google Empresa",
        }
    }

    /// Position in `ALL`, used for the 1-6 toggle keys
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ChannelKind::ALL.get(index).copied()
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    /// Accepts the short id or the display name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ChannelKind::ALL
            .into_iter()
            .find(|k| k.id() == needle || k.name().to_lowercase() == needle)
            .ok_or_else(|| format!("Unknown channel '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub label: String,
    pub completed: bool,
    pub text: String,
    pub images: String,
    pub tags: String,
}

impl Task {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            completed: false,
            text: String::new(),
            images: String::new(),
            tags: String::new(),
        }
    }

    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Text => &self.text,
            TextField::Images => &self.images,
            TextField::Tags => &self.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelKind,
    pub name: String,
    #[serde(rename = "items")]
    pub tasks: Vec<Task>,
    // Older web records omit the flag entirely
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(rename = "categories")]
    pub channels: Vec<Channel>,
}

impl DayRecord {
    pub fn channel(&self, kind: ChannelKind) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == kind)
    }

    pub fn active_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.active)
    }

    /// (completed, total) over the tasks of active channels
    pub fn progress(&self) -> (usize, usize) {
        self.active_channels()
            .flat_map(|c| c.tasks.iter())
            .fold((0, 0), |(done, total), task| {
                (done + usize::from(task.completed), total + 1)
            })
    }
}

/// Every day that has been edited at least once, keyed by `DayKey` text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    pub days: BTreeMap<String, DayRecord>,
}

/// One field-level change to a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEdit {
    Completed(bool),
    Text(String),
    Images(String),
    Tags(String),
}

impl TaskEdit {
    pub fn for_field(field: TextField, value: String) -> Self {
        match field {
            TextField::Text => TaskEdit::Text(value),
            TextField::Images => TaskEdit::Images(value),
            TextField::Tags => TaskEdit::Tags(value),
        }
    }
}

/// The three free-text inputs of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Text,
    Images,
    Tags,
}

impl TextField {
    pub const ALL: [TextField; 3] = [TextField::Text, TextField::Images, TextField::Tags];

    pub fn label(self) -> &'static str {
        match self {
            TextField::Text => "Texto",
            TextField::Images => "Imagens",
            TextField::Tags => "Tags",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            TextField::Text => "Digite aqui o texto da postagem...",
            TextField::Images => "Ex: Foto antes/depois",
            TextField::Tags => "Ex: #limpeza #sp",
        }
    }

    pub fn is_multi_line(self) -> bool {
        matches!(self, TextField::Text)
    }

    pub fn next(self) -> Self {
        match self {
            TextField::Text => TextField::Images,
            TextField::Images => TextField::Tags,
            TextField::Tags => TextField::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDescriptor {
    pub sync_id: String,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SyncStatus,
}

impl SyncDescriptor {
    pub fn new(sync_id: String) -> Self {
        Self {
            sync_id,
            last_sync: None,
            status: SyncStatus::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_parses_id_and_name() {
        assert_eq!("ig".parse::<ChannelKind>(), Ok(ChannelKind::Instagram));
        assert_eq!("Google Empresa".parse::<ChannelKind>(), Ok(ChannelKind::GoogleBusiness));
        assert_eq!(" OLX ".parse::<ChannelKind>(), Ok(ChannelKind::Olx));
        assert!("myspace".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn channel_index_matches_display_order() {
        for (i, kind) in ChannelKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(ChannelKind::from_index(i), Some(*kind));
        }
        assert_eq!(ChannelKind::from_index(6), None);
    }

    #[test]
    fn day_record_uses_web_field_names() {
        let json = r#"{"categories":[{"id":"wa","name":"WhatsApp","items":[
            {"id":"wa-status","label":"Status","completed":true,"text":"oi","images":"","tags":""}
        ]}]}"#;
        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.channels[0].id, ChannelKind::WhatsApp);
        assert!(!record.channels[0].active);
        assert!(record.channels[0].tasks[0].completed);

        let out = serde_json::to_value(&record).unwrap();
        assert!(out["categories"][0]["items"].is_array());
        assert_eq!(out["categories"][0]["id"], "wa");
    }

    #[test]
    fn progress_counts_active_channels_only() {
        let mut done = Task::new("a", "A");
        done.completed = true;
        let record = DayRecord {
            channels: vec![
                Channel {
                    id: ChannelKind::Facebook,
                    name: "Facebook".to_string(),
                    tasks: vec![done.clone(), Task::new("b", "B")],
                    active: true,
                },
                Channel {
                    id: ChannelKind::Olx,
                    name: "OLX".to_string(),
                    tasks: vec![done],
                    active: false,
                },
            ],
        };
        assert_eq!(record.progress(), (1, 2));
    }

    #[test]
    fn sync_descriptor_serializes_camel_case() {
        let descriptor = SyncDescriptor::new("abc12345".to_string());
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["syncId"], "abc12345");
        assert!(value["lastSync"].is_null());
        assert_eq!(value["status"], "idle");
    }
}
