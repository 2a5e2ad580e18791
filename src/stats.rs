//! Per-edge search statistics.
//!
//! The store maps `(fingerprint, action)` to a [`StatRecord`]. It is the only
//! long-lived mutable state of a search and is owned by one engine; nothing
//! else holds a reference to it between calls.

use std::collections::HashMap;
use std::hash::Hash;

/// Statistics for one action taken from one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatRecord {
    visits: u32,
    total_value: f64,
    prior: f64,
}

impl StatRecord {
    /// Fresh record with no visits.
    pub fn new(prior: f64) -> Self {
        Self {
            visits: 0,
            total_value: 0.0,
            prior,
        }
    }

    /// N
    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits
    }

    /// W, summed from the mover's point of view.
    #[inline]
    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    /// P, fixed at creation.
    #[inline]
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Q = W / N.
    ///
    /// # Panics
    /// If the record has never been visited. Callers only read Q on visited
    /// records, so reaching this is a bug in the search.
    #[inline]
    pub fn mean_value(&self) -> f64 {
        assert!(self.visits > 0, "mean value read on an unvisited record");
        self.total_value / self.visits as f64
    }

    /// Q, or `None` before the first visit.
    #[inline]
    pub fn try_mean_value(&self) -> Option<f64> {
        (self.visits > 0).then(|| self.total_value / self.visits as f64)
    }

    fn record(&mut self, value: f64) {
        self.visits += 1;
        self.total_value += value;
    }
}

/// Statistics for every expanded `(fingerprint, action)` pair, grouped by
/// position so lookups borrow the fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsStore<F, A>
where
    F: Eq + Hash,
    A: Eq + Hash,
{
    records: HashMap<F, HashMap<A, StatRecord>>,
}

impl<F, A> Default for StatisticsStore<F, A>
where
    F: Eq + Hash,
    A: Eq + Hash,
{
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<F, A> StatisticsStore<F, A>
where
    F: Eq + Hash,
    A: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &F, action: A) -> Option<&StatRecord> {
        self.records.get(fingerprint)?.get(&action)
    }

    pub fn contains(&self, fingerprint: &F, action: A) -> bool {
        self.get(fingerprint, action).is_some()
    }

    /// Create a zeroed record unless one exists. Returns whether a record was
    /// created; an existing record keeps its prior.
    pub fn insert_if_absent(&mut self, fingerprint: F, action: A, prior: f64) -> bool {
        use std::collections::hash_map::Entry;
        match self.records.entry(fingerprint).or_default().entry(action) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(StatRecord::new(prior));
                true
            }
        }
    }

    /// Add one visit worth `value` to an existing record. Missing records are
    /// left alone and `false` is returned.
    pub fn update(&mut self, fingerprint: &F, action: A, value: f64) -> bool {
        match self
            .records
            .get_mut(fingerprint)
            .and_then(|actions| actions.get_mut(&action))
        {
            Some(record) => {
                record.record(value);
                true
            }
            None => false,
        }
    }

    /// Sum of N over `actions` at `fingerprint`; missing records count as 0.
    pub fn total_visits(&self, fingerprint: &F, actions: &[A]) -> u32 {
        let Some(recorded) = self.records.get(fingerprint) else {
            return 0;
        };
        actions
            .iter()
            .filter_map(|a| recorded.get(a))
            .map(StatRecord::visits)
            .sum()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// All records, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&F, &A, &StatRecord)> + '_ {
        self.records
            .iter()
            .flat_map(|(f, actions)| actions.iter().map(move |(a, r)| (f, a, r)))
    }
}
