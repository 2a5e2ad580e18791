//! Child selection scores.
//!
//! - UCB1 for plain rollout search:
//!   `Q + C * sqrt(ln(N_total) / N)`
//! - PUCT when an oracle supplies priors:
//!   `Q + C * P * sqrt(N_total) / (1 + N)`
//!
//! Scores are pure functions of the stored statistics. Ties always go to the
//! action that comes first in the game's enumeration order.

use std::hash::Hash;

use crate::stats::{StatRecord, StatisticsStore};

/// Which score to use when every legal action already has a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    Ucb1 { c: f64 },
    Puct { c: f64 },
}

impl Strategy {
    #[inline]
    pub fn score(&self, record: &StatRecord, total_visits: u32) -> f64 {
        match *self {
            Strategy::Ucb1 { c } => ucb1(record, total_visits, c),
            Strategy::Puct { c } => puct(record, total_visits, c),
        }
    }

    /// Highest-scoring action among `legal` at `fingerprint`.
    ///
    /// Returns `None` if `legal` is empty or any action lacks a record.
    pub fn select<F, A>(
        &self,
        store: &StatisticsStore<F, A>,
        fingerprint: &F,
        legal: &[A],
    ) -> Option<A>
    where
        F: Clone + Eq + Hash,
        A: Copy + Eq + Hash,
    {
        let total = store.total_visits(fingerprint, legal);
        let mut scored = Vec::with_capacity(legal.len());
        for &a in legal {
            let record = store.get(fingerprint, a)?;
            scored.push((a, self.score(record, total)));
        }
        argmax(scored)
    }
}

/// UCB1 score.
///
/// # Panics
/// If the record is unvisited; unvisited actions go through expansion and are
/// never scored with UCB1.
#[inline]
pub fn ucb1(record: &StatRecord, total_visits: u32, c: f64) -> f64 {
    let n = record.visits() as f64;
    record.mean_value() + c * ((total_visits as f64).ln() / n).sqrt()
}

/// PUCT score. Unvisited records count as Q = 0, and with no sibling visits
/// at all the exploration term still ranks actions by prior.
#[inline]
pub fn puct(record: &StatRecord, total_visits: u32, c: f64) -> f64 {
    let q = record.try_mean_value().unwrap_or(0.0);
    let total = total_visits.max(1) as f64;
    q + c * record.prior() * total.sqrt() / (1.0 + record.visits() as f64)
}

/// The item with the greatest score; on ties the earliest item wins.
pub fn argmax<T>(scored: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for (item, score) in scored {
        let better = match &best {
            Some((_, s)) => score > *s,
            None => true,
        };
        if better {
            best = Some((item, score));
        }
    }
    best.map(|(item, _)| item)
}
