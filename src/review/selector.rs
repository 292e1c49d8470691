//! Selection of items that are due for review

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::progress::{ProgressStore, Result};
use crate::scheduling::{ItemId, ProgressRecord, MAX_INTERVAL_DAYS};

/// Streak at which an item counts as mature
pub const MATURE_STREAK: u32 = 3;

/// Counts of items by learning stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_items: usize,
    /// Never reviewed
    pub new_items: usize,
    /// Reviewed, streak below `MATURE_STREAK`
    pub learning_items: usize,
    pub mature_items: usize,
    pub due_items: usize,
    pub total_lapses: u64,
}

/// Read-only view of the progress store that answers "what is due?".
///
/// Nothing here writes to the store, so every query can be repeated freely.
pub struct ReviewSelector<'a, S: ProgressStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ProgressStore + ?Sized> ReviewSelector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Items due at `now`, in review order.
    ///
    /// `items` is the catalogue in creation order. Never-reviewed items come
    /// first in that order, followed by reviewed items whose next review has
    /// arrived, most overdue first. Records for items outside the catalogue
    /// are ignored.
    pub fn due_items(&self, items: &[ItemId], now: DateTime<Utc>) -> Result<Vec<ItemId>> {
        let records = self.records()?;
        let mut seen = HashSet::with_capacity(items.len());
        let mut unreviewed = Vec::new();
        let mut overdue = Vec::new();

        for (position, item_id) in items.iter().enumerate() {
            if !seen.insert(*item_id) {
                continue;
            }
            match records.get(item_id).and_then(|r| r.next_review_at) {
                None => unreviewed.push(*item_id),
                Some(due) if due <= now => overdue.push((due, position, *item_id)),
                Some(_) => {}
            }
        }

        // Creation order breaks ties between equally overdue items
        overdue.sort();

        unreviewed.extend(overdue.into_iter().map(|(_, _, item_id)| item_id));
        Ok(unreviewed)
    }

    /// Stage counts for the catalogue at `now`
    pub fn summary(&self, items: &[ItemId], now: DateTime<Utc>) -> Result<ProgressSummary> {
        let records = self.records()?;
        let mut summary = ProgressSummary::default();

        for item_id in items.iter().collect::<HashSet<_>>() {
            summary.total_items += 1;
            match records.get(item_id) {
                None => {
                    summary.new_items += 1;
                    summary.due_items += 1;
                }
                Some(record) => {
                    if record.is_new() {
                        summary.new_items += 1;
                    } else if record.streak >= MATURE_STREAK {
                        summary.mature_items += 1;
                    } else {
                        summary.learning_items += 1;
                    }
                    if record.is_due(now) {
                        summary.due_items += 1;
                    }
                    summary.total_lapses += u64::from(record.lapse_count);
                }
            }
        }

        Ok(summary)
    }

    /// How many items fall due on each of the next `days` days.
    ///
    /// Entry `i` counts items whose next review lies in
    /// `(now + i days, now + (i + 1) days]`. Items already due are not counted.
    /// No interval exceeds `MAX_INTERVAL_DAYS`, so longer windows are cut to it.
    pub fn upcoming(&self, items: &[ItemId], now: DateTime<Utc>, days: u32) -> Result<Vec<usize>> {
        let days = days.min(MAX_INTERVAL_DAYS);
        let records = self.records()?;
        let mut forecast = vec![0usize; days as usize];
        let horizon = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        for item_id in items.iter().collect::<HashSet<_>>() {
            let Some(due) = records.get(item_id).and_then(|r| r.next_review_at) else {
                continue;
            };
            if due <= now || due > horizon {
                continue;
            }
            let elapsed = due - now;
            // Exact day boundaries belong to the earlier day
            let mut day = elapsed.num_days();
            if elapsed == Duration::days(day) {
                day -= 1;
            }
            if let Some(slot) = forecast.get_mut(day as usize) {
                *slot += 1;
            }
        }

        Ok(forecast)
    }

    fn records(&self) -> Result<HashMap<ItemId, ProgressRecord>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(|record| (record.item_id, record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemoryProgressStore, Revision};
    use crate::scheduling::{Grade, SchedulingEngine};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    /// Review `item_id` with the given grades, each at `at`
    fn review(store: &MemoryProgressStore, item_id: ItemId, grades: &[Grade], at: DateTime<Utc>) {
        let engine = SchedulingEngine::default();
        for grade in grades {
            let current = store.fetch(item_id).unwrap();
            let next = engine.next_state(&current.value, *grade, at).unwrap();
            store.put(&next, current.revision).unwrap();
        }
    }

    #[test]
    fn test_due_set_and_order() {
        let store = MemoryProgressStore::default();
        let items: Vec<ItemId> = (0..5).map(|_| Uuid::new_v4()).collect();

        // items[0]: due one day after t0 - 2d, so a day overdue at t0
        review(&store, items[0], &[Grade::Good], t0() - Duration::days(2));
        // items[1]: never reviewed
        // items[2]: due six days after t0 - 10d, four days overdue
        review(&store, items[2], &[Grade::Good, Grade::Good], t0() - Duration::days(10));
        // items[3]: reviewed at t0, not due until tomorrow
        review(&store, items[3], &[Grade::Good], t0());
        // items[4]: never reviewed

        let due = ReviewSelector::new(&store).due_items(&items, t0()).unwrap();
        assert_eq!(due, vec![items[1], items[4], items[2], items[0]]);
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let store = MemoryProgressStore::default();
        let item = Uuid::new_v4();
        review(&store, item, &[Grade::Good], t0());
        let selector = ReviewSelector::new(&store);

        let due_at = t0() + Duration::days(1);
        assert!(selector.due_items(&[item], due_at - Duration::seconds(1)).unwrap().is_empty());
        assert_eq!(selector.due_items(&[item], due_at).unwrap(), vec![item]);
    }

    #[test]
    fn test_ties_follow_creation_order() {
        let store = MemoryProgressStore::default();
        let items: Vec<ItemId> = (0..3).map(|_| Uuid::new_v4()).collect();
        for item in items.iter().rev() {
            review(&store, *item, &[Grade::Fail], t0());
        }

        let later = t0() + Duration::days(3);
        let due = ReviewSelector::new(&store).due_items(&items, later).unwrap();
        assert_eq!(due, items);
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let store = MemoryProgressStore::default();
        let items: Vec<ItemId> = (0..3).map(|_| Uuid::new_v4()).collect();
        review(&store, items[0], &[Grade::Good], t0());

        let selector = ReviewSelector::new(&store);
        let first = selector.due_items(&items, t0()).unwrap();
        let second = selector.due_items(&items, t0()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.usage().unwrap().records, 1);
        assert_eq!(store.fetch(items[0]).unwrap().revision, Revision(1));
    }

    #[test]
    fn test_orphans_and_duplicates_are_ignored() {
        let store = MemoryProgressStore::default();
        let orphan = Uuid::new_v4();
        review(&store, orphan, &[Grade::Good], t0() - Duration::days(5));

        let item = Uuid::new_v4();
        let due = ReviewSelector::new(&store).due_items(&[item, item], t0()).unwrap();
        assert_eq!(due, vec![item]);
    }

    #[test]
    fn test_summary() {
        let store = MemoryProgressStore::default();
        let items: Vec<ItemId> = (0..4).map(|_| Uuid::new_v4()).collect();
        review(&store, items[0], &[Grade::Good], t0() - Duration::days(3));
        review(&store, items[1], &[Grade::Good, Grade::Good, Grade::Good], t0());
        review(&store, items[2], &[Grade::Good, Grade::Fail], t0());

        let summary = ReviewSelector::new(&store).summary(&items, t0()).unwrap();
        assert_eq!(
            summary,
            ProgressSummary {
                total_items: 4,
                new_items: 1,
                learning_items: 2,
                mature_items: 1,
                due_items: 2,
                total_lapses: 1,
            }
        );
    }

    #[test]
    fn test_upcoming_forecast() {
        let store = MemoryProgressStore::default();
        let items: Vec<ItemId> = (0..4).map(|_| Uuid::new_v4()).collect();
        // Due exactly one day out
        review(&store, items[0], &[Grade::Good], t0());
        // Due six days out
        review(&store, items[1], &[Grade::Good, Grade::Good], t0());
        // Due 15 days out, beyond the window
        review(&store, items[2], &[Grade::Good, Grade::Good, Grade::Good], t0());
        // items[3] never reviewed: already due, not forecast

        let forecast = ReviewSelector::new(&store).upcoming(&items, t0(), 7).unwrap();
        assert_eq!(forecast, vec![1, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_upcoming_window_is_capped() {
        let store = MemoryProgressStore::default();
        let item = Uuid::new_v4();
        review(&store, item, &[Grade::Good], t0());
        let selector = ReviewSelector::new(&store);

        let forecast = selector.upcoming(&[item], t0(), u32::MAX).unwrap();
        assert_eq!(forecast.len(), MAX_INTERVAL_DAYS as usize);
        assert_eq!(forecast[0], 1);

        // Close to the end of representable time the horizon saturates
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(2);
        let forecast = selector.upcoming(&[item], late, 100_000_000).unwrap();
        assert!(forecast.iter().all(|count| *count == 0));
    }
}
