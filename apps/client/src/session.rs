//! Due-card and new-card selection for a review session.

use crate::catalog::{CatalogError, CatalogProvider};
use crate::db::KeyValueStore;
use crate::store::LocalStateStore;
use chrono::{DateTime, Utc};
use tango_core::{Card, CardKind, SessionQueue};

pub struct SessionSelector<'a, P: ?Sized, K> {
    catalog: &'a P,
    store: &'a LocalStateStore<K>,
}

impl<'a, P, K> SessionSelector<'a, P, K>
where
    P: CatalogProvider + ?Sized,
    K: KeyValueStore,
{
    pub fn new(catalog: &'a P, store: &'a LocalStateStore<K>) -> Self {
        Self { catalog, store }
    }

    /// Cards with no stored state, or whose `due` instant has passed.
    /// Catalog order.
    pub fn due_cards(&self, kind: CardKind, now: DateTime<Utc>) -> Result<Vec<Card>, CatalogError> {
        let states = self.store.get_all();
        Ok(self
            .catalog
            .cards(kind)?
            .into_iter()
            .filter(|card| states.get(&card.id).map_or(true, |s| s.is_due(now)))
            .collect())
    }

    /// Up to `limit` cards that have never been reviewed, in catalog order.
    pub fn new_cards(&self, kind: CardKind, limit: usize) -> Result<Vec<Card>, CatalogError> {
        let states = self.store.get_all();
        Ok(self
            .catalog
            .cards(kind)?
            .into_iter()
            .filter(|card| !states.contains_key(&card.id))
            .take(limit)
            .collect())
    }

    /// Both queues. A never-reviewed card may appear in each.
    pub fn build_queue(
        &self,
        kind: CardKind,
        new_limit: usize,
        now: DateTime<Utc>,
    ) -> Result<SessionQueue, CatalogError> {
        let queue = SessionQueue {
            due_cards: self.due_cards(kind, now)?,
            new_cards: self.new_cards(kind, new_limit)?,
        };
        tracing::debug!(
            kind = kind.as_str(),
            due = queue.due_cards.len(),
            new = queue.new_cards.len(),
            "built session queue"
        );
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::db::MemoryStore;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tango_core::{CardStatus, SchedulingState};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "word": {
                    "active": [
                        {"id": 1, "lemma": "一"}, {"id": 2, "lemma": "二"},
                        {"id": 3, "lemma": "三"}, {"id": 4, "lemma": "四"}
                    ],
                    "mastered": {"N5": [{"id": 5, "lemma": "五"}]}
                },
                "sentence": {"active": [{"id": 100, "lemma": "おはよう。"}]}
            }"#,
        )
        .unwrap()
    }

    fn state_due_in(card_id: i64, offset: Duration) -> SchedulingState {
        SchedulingState {
            stability: 3.0,
            reps: 2,
            status: CardStatus::Review,
            due: now() + offset,
            last_review: Some(now() - Duration::days(3)),
            ..SchedulingState::new(card_id, now())
        }
    }

    fn ids(cards: &[Card]) -> Vec<i64> {
        cards.iter().map(|c| c.id).collect()
    }

    #[test]
    fn due_uses_exact_instant() {
        let store = LocalStateStore::new(MemoryStore::new());
        // Later today: same calendar date, but not yet due.
        store.put(1, &state_due_in(1, Duration::hours(2))).unwrap();
        store.put(2, &state_due_in(2, Duration::zero())).unwrap();
        store.put(3, &state_due_in(3, -Duration::seconds(1))).unwrap();
        store.put(5, &state_due_in(5, Duration::days(10))).unwrap();

        let catalog = catalog();
        let selector = SessionSelector::new(&catalog, &store);

        assert_eq!(ids(&selector.due_cards(CardKind::Word, now()).unwrap()), vec![2, 3, 4]);
    }

    #[test]
    fn unreviewed_cards_are_due_and_new() {
        let store = LocalStateStore::new(MemoryStore::new());
        store.put(2, &state_due_in(2, Duration::days(1))).unwrap();

        let catalog = catalog();
        let selector = SessionSelector::new(&catalog, &store);
        let queue = selector.build_queue(CardKind::Word, 10, now()).unwrap();

        assert_eq!(ids(&queue.due_cards), vec![1, 3, 4, 5]);
        assert_eq!(ids(&queue.new_cards), vec![1, 3, 4, 5]);
    }

    #[test]
    fn new_cards_respect_limit_and_kind() {
        let store = LocalStateStore::new(MemoryStore::new());
        store.put(1, &state_due_in(1, Duration::days(1))).unwrap();

        let catalog = catalog();
        let selector = SessionSelector::new(&catalog, &store);

        assert_eq!(ids(&selector.new_cards(CardKind::Word, 2).unwrap()), vec![2, 3]);
        assert_eq!(ids(&selector.new_cards(CardKind::Sentence, 5).unwrap()), vec![100]);
        assert!(selector.new_cards(CardKind::Word, 0).unwrap().is_empty());
    }
}
