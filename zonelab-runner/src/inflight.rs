//! At most one in-flight evaluate-and-notify cycle per symbol.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared registry of symbols currently being processed. Cheap to clone;
/// clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

/// RAII permit for one symbol. Dropping it releases the symbol.
#[derive(Debug)]
pub struct InFlightPermit {
    symbol: String,
    active: Arc<Mutex<HashSet<String>>>,
}

fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `symbol`, or `None` if another cycle already holds it.
    pub fn try_acquire(&self, symbol: &str) -> Option<InFlightPermit> {
        if !lock(&self.active).insert(symbol.to_string()) {
            return None;
        }
        Some(InFlightPermit {
            symbol: symbol.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_in_flight(&self, symbol: &str) -> bool {
        lock(&self.active).contains(symbol)
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.active).len()
    }
}

impl InFlightPermit {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let guard = InFlightGuard::new();
        let permit = guard.try_acquire("BTCUSDT").unwrap();
        assert_eq!(permit.symbol(), "BTCUSDT");
        assert!(guard.is_in_flight("BTCUSDT"));
        assert!(guard.try_acquire("BTCUSDT").is_none());
        assert!(guard.try_acquire("ETHUSDT").is_some());

        drop(permit);
        assert!(!guard.is_in_flight("BTCUSDT"));
        assert!(guard.try_acquire("BTCUSDT").is_some());
    }

    #[test]
    fn clones_share_the_registry() {
        let a = InFlightGuard::new();
        let b = a.clone();
        let _permit = a.try_acquire("SOLUSDT").unwrap();
        assert!(b.try_acquire("SOLUSDT").is_none());
        assert_eq!(b.in_flight(), 1);
    }

    #[test]
    fn only_one_thread_wins_a_symbol() {
        let guard = InFlightGuard::new();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    // Hold the permit until every thread has tried.
                    let permit = guard.try_acquire("BTCUSDT");
                    let won = permit.is_some();
                    barrier.wait();
                    won
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(guard.in_flight(), 0);
    }
}
