use crate::models::{Channel, ChannelKind, DayRecord, Task};

/// Task ids and labels for each channel, in display order
fn template_tasks(kind: ChannelKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ChannelKind::Facebook => &[
            ("fb-page", "Postagem da Página"),
            ("fb-market", "Marketplace"),
            ("fb-group", "Grupo"),
        ],
        ChannelKind::Instagram => &[
            ("ig-post", "Postagem"),
            ("ig-story", "Status (Stories)"),
            ("ig-reels", "Reels"),
        ],
        ChannelKind::WhatsApp => &[("wa-status", "Status")],
        ChannelKind::Olx => &[("olx-ads", "Anúncios")],
        ChannelKind::TikTok => &[("tt-services", "Serviços"), ("tt-auction", "Leilão")],
        ChannelKind::GoogleBusiness => &[("ge-post", "Postagem")],
    }
}

pub fn seed_channel(kind: ChannelKind) -> Channel {
    Channel {
        id: kind,
        name: kind.name().to_string(),
        tasks: template_tasks(kind)
            .iter()
            .map(|(id, label)| Task::new(id, label))
            .collect(),
        active: false,
    }
}

/// The record a day has before it is ever edited: every channel present
/// and inactive, every task incomplete and blank.
pub fn seed_day() -> DayRecord {
    DayRecord {
        channels: ChannelKind::ALL.into_iter().map(seed_channel).collect(),
    }
}

/// Look up a task's template label without materializing a day
pub fn task_label(task_id: &str) -> Option<&'static str> {
    ChannelKind::ALL
        .into_iter()
        .flat_map(|kind| template_tasks(kind).iter())
        .find(|(id, _)| *id == task_id)
        .map(|(_, label)| *label)
}

/// Which channel owns a template task id
pub fn channel_for_task(task_id: &str) -> Option<ChannelKind> {
    ChannelKind::ALL
        .into_iter()
        .find(|kind| template_tasks(*kind).iter().any(|(id, _)| *id == task_id))
}
