use std::collections::{BTreeMap, HashMap};

use lockstep_time::EmuTime;

use crate::{SchedulableId, SyncToken};

/// A scheduled callback, as handed out by [`PendingSet::pop_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyncPoint {
    pub time: EmuTime,
    pub owner: SchedulableId,
    pub token: SyncToken,
}

/// Ordering key: due time first, then insertion sequence for stable ties.
type Key = (EmuTime, u64);

/// Pending sync points ordered by `(time, insertion sequence)`, indexed by `(owner, token)`.
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    by_time: BTreeMap<Key, (SchedulableId, SyncToken)>,
    by_owner: HashMap<(SchedulableId, SyncToken), Key>,
    next_seq: u64,
}

impl PendingSet {
    /// Inserts a sync point, replacing any existing entry for the same `(owner, token)`.
    ///
    /// A replaced entry counts as a fresh insertion for tie-breaking.
    pub fn insert(&mut self, time: EmuTime, owner: SchedulableId, token: SyncToken) {
        self.remove(owner, token);
        let key = (time, self.next_seq);
        self.next_seq += 1;
        self.by_time.insert(key, (owner, token));
        self.by_owner.insert((owner, token), key);
    }

    pub fn remove(&mut self, owner: SchedulableId, token: SyncToken) -> bool {
        match self.by_owner.remove(&(owner, token)) {
            Some(key) => {
                self.by_time.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn remove_owner(&mut self, owner: SchedulableId) -> usize {
        let tokens: Vec<SyncToken> = self
            .by_owner
            .keys()
            .filter(|(o, _)| *o == owner)
            .map(|&(_, token)| token)
            .collect();
        for &token in &tokens {
            self.remove(owner, token);
        }
        tokens.len()
    }

    /// Removes and returns the earliest entry if it is due at or before `limit`.
    pub fn pop_due(&mut self, limit: EmuTime) -> Option<SyncPoint> {
        let (&(time, _), _) = self.by_time.first_key_value()?;
        if time > limit {
            return None;
        }
        let ((time, _), (owner, token)) = self.by_time.pop_first()?;
        self.by_owner.remove(&(owner, token));
        Some(SyncPoint { time, owner, token })
    }

    pub fn next_time(&self) -> Option<EmuTime> {
        self.by_time.first_key_value().map(|(&(time, _), _)| time)
    }

    pub fn time_of(&self, owner: SchedulableId, token: SyncToken) -> Option<EmuTime> {
        self.by_owner.get(&(owner, token)).map(|&(time, _)| time)
    }

    pub fn len(&self) -> usize {
        self.by_time.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(ticks: u64) -> EmuTime {
        EmuTime::from_ticks(ticks)
    }

    #[test]
    fn ties_pop_in_insertion_order() {
        let mut set = PendingSet::default();
        let a = SchedulableId::from_raw(1);
        let b = SchedulableId::from_raw(2);
        set.insert(t(5), b, 0);
        set.insert(t(5), a, 0);
        set.insert(t(3), a, 1);

        let order: Vec<_> = std::iter::from_fn(|| set.pop_due(t(10)))
            .map(|p| (p.time.ticks(), p.owner, p.token))
            .collect();
        assert_eq!(order, vec![(3, a, 1), (5, b, 0), (5, a, 0)]);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn replace_moves_entry_and_keeps_single_copy() {
        let mut set = PendingSet::default();
        let a = SchedulableId::from_raw(1);
        set.insert(t(5), a, 7);
        set.insert(t(9), a, 7);
        assert_eq!(set.len(), 1);
        assert_eq!(set.time_of(a, 7), Some(t(9)));
        assert_eq!(set.pop_due(t(8)), None);
    }

    #[test]
    fn remove_owner_leaves_other_owners() {
        let mut set = PendingSet::default();
        let a = SchedulableId::from_raw(1);
        let b = SchedulableId::from_raw(2);
        set.insert(t(1), a, 0);
        set.insert(t(2), a, 1);
        set.insert(t(3), b, 0);
        assert_eq!(set.remove_owner(a), 2);
        assert_eq!(set.remove_owner(a), 0);
        assert_eq!(set.next_time(), Some(t(3)));
    }
}
