use std::collections::BTreeSet;

use crate::block_quota::BlockQuotaTracker;
use crate::catalog::Catalog;
use crate::display::format_countdown;
use crate::guests::SpecialGuestReservation;

/// Catalog indices awarded during a session. An index is recorded at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinLedger {
    won: BTreeSet<usize>,
}

impl WinLedger {
    /// Returns false if the index was already in the ledger.
    pub fn record(&mut self, index: usize) -> bool {
        self.won.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.won.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.won.len()
    }

    pub fn is_empty(&self) -> bool {
        self.won.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u64,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Self { remaining_secs: duration_secs }
    }

    /// Counts down one second, stopping at zero.
    pub fn tick(&mut self) -> u64 {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.remaining_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn display(&self) -> String {
        format_countdown(self.remaining_secs)
    }
}

/// Result of one countdown second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTick {
    pub epoch: u64,
    pub remaining_secs: u64,
    pub expired: bool,
}

/// One time-boxed period of play. `epoch` grows across the run and never
/// repeats, so work scheduled for an old session can be recognised.
#[derive(Debug, Clone)]
pub struct Session {
    pub epoch: u64,
    pub number: u32,
    pub catalog: Catalog,
    pub ledger: WinLedger,
    pub block: Option<BlockQuotaTracker>,
    pub reservation: Option<SpecialGuestReservation>,
    pub countdown: Countdown,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.countdown.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_records_once() {
        let mut ledger = WinLedger::default();
        assert!(ledger.record(4));
        assert!(!ledger.record(4));
        assert!(ledger.contains(4));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_countdown_stops_at_zero() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.display(), "0:02");
        assert_eq!(countdown.tick(), 1);
        assert!(!countdown.is_expired());
        assert_eq!(countdown.tick(), 0);
        assert_eq!(countdown.tick(), 0);
        assert!(countdown.is_expired());
        assert_eq!(Countdown::new(600).display(), "10:00");
    }
}
