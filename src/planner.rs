use chrono::{Datelike, NaiveDate};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

use crate::models::{ChannelKind, DayRecord, Store, TaskEdit};
use crate::template::seed_day;

/// Store key for one calendar day: `year-month-day`, month 1-based and
/// nothing zero-padded (`2024-3-7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayKey(String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{}-{}-{}", date.year(), date.month(), date.day()))
    }

    /// Parse a stored key back into a date. Also accepts padded ISO dates.
    pub fn parse(key: &str) -> Option<NaiveDate> {
        let mut parts = key.trim().splitn(3, '-');
        let year = parts.next()?.parse::<i32>().ok()?;
        let month = parts.next()?.parse::<u32>().ok()?;
        let day = parts.next()?.parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        DayKey::from_date(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Store {
    /// Read a day, seeding it from the template when it has no record.
    /// Reading never inserts.
    pub fn day(&self, key: &DayKey) -> Cow<'_, DayRecord> {
        match self.days.get(key.as_str()) {
            Some(record) => Cow::Borrowed(record),
            None => Cow::Owned(seed_day()),
        }
    }

    pub fn contains_day(&self, key: &DayKey) -> bool {
        self.days.contains_key(key.as_str())
    }

    /// Flip a channel's `active` flag and write the day back
    pub fn toggle_channel(&mut self, key: &DayKey, kind: ChannelKind) {
        let mut record = self.day(key).into_owned();
        for channel in record.channels.iter_mut().filter(|c| c.id == kind) {
            channel.active = !channel.active;
        }
        debug!(day = %key, channel = %kind, "toggled channel");
        self.days.insert(key.to_string(), record);
    }

    /// Replace exactly one field of one task and write the day back.
    /// An unknown task id leaves the record as it was.
    pub fn update_task(&mut self, key: &DayKey, kind: ChannelKind, task_id: &str, edit: TaskEdit) {
        let mut record = self.day(key).into_owned();
        let task = record
            .channels
            .iter_mut()
            .filter(|c| c.id == kind)
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| t.id == task_id);

        if let Some(task) = task {
            match edit {
                TaskEdit::Completed(done) => task.completed = done,
                TaskEdit::Text(value) => task.text = value,
                TaskEdit::Images(value) => task.images = value,
                TaskEdit::Tags(value) => task.tags = value,
            }
            debug!(day = %key, channel = %kind, task = task_id, "updated task");
        }
        self.days.insert(key.to_string(), record);
    }

    /// Flip a task's completion flag. Returns the new value when the task exists.
    pub fn toggle_task(&mut self, key: &DayKey, kind: ChannelKind, task_id: &str) -> Option<bool> {
        let completed = self
            .day(key)
            .channel(kind)?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| !t.completed)?;
        self.update_task(key, kind, task_id, TaskEdit::Completed(completed));
        Some(completed)
    }
}

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Move to another day of the same month, clamping to the month's length
pub fn with_day(date: NaiveDate, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(date));
    date.with_day(day).unwrap_or(date)
}

/// Shift by whole months, clamping the day (Jan 31 + 1 month = Feb 28/29)
pub fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => with_day(first, date.day()),
        None => date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextField;

    fn key() -> DayKey {
        DayKey::from_date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())
    }

    #[test]
    fn day_key_is_unpadded() {
        assert_eq!(key().as_str(), "2024-3-7");
        let dec = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        assert_eq!(DayKey::from(dec).to_string(), "2025-12-25");
    }

    #[test]
    fn day_key_parse_accepts_both_forms() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(DayKey::parse("2024-3-7"), Some(date));
        assert_eq!(DayKey::parse("2024-03-07"), Some(date));
        assert_eq!(DayKey::parse("2024-2-30"), None);
        assert_eq!(DayKey::parse("garbage"), None);
    }

    #[test]
    fn reading_unknown_day_yields_template_without_inserting() {
        let store = Store::default();
        let day = store.day(&key());
        assert_eq!(*day, seed_day());
        assert!(!store.contains_day(&key()));
    }

    #[test]
    fn toggling_channel_twice_restores_it() {
        let mut store = Store::default();
        store.toggle_channel(&key(), ChannelKind::Instagram);
        assert!(store.day(&key()).channel(ChannelKind::Instagram).unwrap().active);

        store.toggle_channel(&key(), ChannelKind::Instagram);
        assert_eq!(*store.day(&key()), seed_day());
        // The day stays materialized once it was written
        assert!(store.contains_day(&key()));
    }

    #[test]
    fn toggling_one_channel_leaves_others_alone() {
        let mut store = Store::default();
        store.update_task(&key(), ChannelKind::Facebook, "fb-page", TaskEdit::Text("promo".into()));
        let before = store.day(&key()).into_owned();

        store.toggle_channel(&key(), ChannelKind::TikTok);
        let after = store.day(&key()).into_owned();

        for (b, a) in before.channels.iter().zip(after.channels.iter()) {
            if a.id == ChannelKind::TikTok {
                assert_ne!(a.active, b.active);
                assert_eq!(a.tasks, b.tasks);
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn updating_one_field_changes_nothing_else() {
        let mut store = Store::default();
        store.update_task(&key(), ChannelKind::Instagram, "ig-story", TaskEdit::Tags("#sp".into()));
        let before = store.day(&key()).into_owned();

        store.update_task(&key(), ChannelKind::Instagram, "ig-reels", TaskEdit::Text("antes/depois".into()));
        let after = store.day(&key()).into_owned();

        for (b, a) in before.channels.iter().zip(after.channels.iter()) {
            for (bt, at) in b.tasks.iter().zip(a.tasks.iter()) {
                if at.id == "ig-reels" {
                    assert_eq!(at.text, "antes/depois");
                    assert_eq!(at.images, bt.images);
                    assert_eq!(at.tags, bt.tags);
                    assert_eq!(at.completed, bt.completed);
                } else {
                    assert_eq!(at, bt);
                }
            }
            assert_eq!(a.active, b.active);
        }
    }

    #[test]
    fn update_with_unknown_task_is_a_no_op_on_content() {
        let mut store = Store::default();
        store.update_task(&key(), ChannelKind::Olx, "fb-page", TaskEdit::Completed(true));
        assert_eq!(*store.day(&key()), seed_day());
    }

    #[test]
    fn edits_are_scoped_to_their_day() {
        let mut store = Store::default();
        let other = DayKey::from_date(NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        store.update_task(&key(), ChannelKind::WhatsApp, "wa-status", TaskEdit::for_field(TextField::Images, "foto".into()));
        assert_eq!(*store.day(&other), seed_day());
    }

    #[test]
    fn toggle_task_flips_completion() {
        let mut store = Store::default();
        assert_eq!(store.toggle_task(&key(), ChannelKind::WhatsApp, "wa-status"), Some(true));
        assert_eq!(store.toggle_task(&key(), ChannelKind::WhatsApp, "wa-status"), Some(false));
        assert_eq!(store.toggle_task(&key(), ChannelKind::WhatsApp, "missing"), None);
    }

    #[test]
    fn month_helpers() {
        let feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(days_in_month(feb), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()), 31);

        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(shift_month(jan31, 1), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(shift_month(jan31, -1), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(with_day(feb, 40), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
