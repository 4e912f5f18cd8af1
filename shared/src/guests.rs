use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::SegmentValue;
use crate::error::WheelError;
use crate::rng::{choose, IndexSource};

/// Guest numbers `1..=total` that have not received a prize yet. Numbers
/// only ever leave the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestPool {
    total: u32,
    remaining: BTreeSet<u32>,
}

impl GuestPool {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            remaining: (1..=total).collect(),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn contains(&self, guest: u32) -> bool {
        self.remaining.contains(&guest)
    }

    /// Returns false if the guest had already left the pool.
    pub fn remove(&mut self, guest: u32) -> bool {
        self.remaining.remove(&guest)
    }

    pub fn candidates(&self, excluding: Option<u32>) -> Vec<u32> {
        self.remaining
            .iter()
            .copied()
            .filter(|guest| Some(*guest) != excluding)
            .collect()
    }
}

/// A guest pinned to a prize amount for one session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SpecialGuestReservation {
    pub guest_id: u32,
    pub required_amount: u64,
}

impl SpecialGuestReservation {
    /// The reservation still waits for its prize.
    pub fn is_pending(&self, pool: &GuestPool) -> bool {
        pool.contains(self.guest_id)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct GuestAssignment {
    pub guest: u32,
    pub reserved: bool,
}

/// Decides who receives `value`. Reads the pool without changing it.
pub fn assign_guest(
    pool: &GuestPool,
    reservation: Option<&SpecialGuestReservation>,
    value: &SegmentValue,
    source: &mut impl IndexSource,
) -> Result<GuestAssignment, WheelError> {
    if pool.is_empty() {
        return Err(WheelError::ExhaustedGuests);
    }
    let pending = reservation.filter(|r| r.is_pending(pool));

    if let Some(r) = pending {
        if value.amount() == Some(r.required_amount) {
            return Ok(GuestAssignment { guest: r.guest_id, reserved: true });
        }
    }

    let mut candidates = pool.candidates(pending.map(|r| r.guest_id));
    if candidates.is_empty() {
        candidates = pool.candidates(None);
    }

    choose(source, &candidates)
        .map(|guest| GuestAssignment { guest, reserved: false })
        .ok_or(WheelError::ExhaustedGuests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandSource, ScriptedSource};

    const RESERVATION: SpecialGuestReservation = SpecialGuestReservation {
        guest_id: 3,
        required_amount: 50_000,
    };

    #[test]
    fn test_pool_removes_once() {
        let mut pool = GuestPool::new(5);
        assert_eq!(pool.len(), 5);
        assert!(pool.remove(2));
        assert!(!pool.remove(2));
        assert!(!pool.contains(2));
        assert_eq!(pool.candidates(Some(4)), vec![1, 3, 5]);
    }

    #[test]
    fn test_reserved_guest_gets_required_prize() {
        let pool = GuestPool::new(5);
        let assignment = assign_guest(
            &pool,
            Some(&RESERVATION),
            &SegmentValue::Amount(50_000),
            &mut ScriptedSource::new([0]),
        );
        assert_eq!(assignment, Ok(GuestAssignment { guest: 3, reserved: true }));
    }

    #[test]
    fn test_reserved_guest_not_drawn_early() {
        let pool = GuestPool::new(5);
        let mut source = RandSource::seeded(5);
        for _ in 0..200 {
            let assignment = assign_guest(&pool, Some(&RESERVATION), &SegmentValue::Amount(10_000), &mut source);
            assert_ne!(assignment.map(|a| a.guest), Ok(3));
        }
    }

    #[test]
    fn test_reservation_moot_once_guest_has_won() {
        let mut pool = GuestPool::new(5);
        pool.remove(3);
        let assignment = assign_guest(
            &pool,
            Some(&RESERVATION),
            &SegmentValue::Amount(50_000),
            &mut ScriptedSource::new([0]),
        );
        assert_eq!(assignment, Ok(GuestAssignment { guest: 1, reserved: false }));
    }

    #[test]
    fn test_falls_back_to_reserved_guest_when_alone() {
        let mut pool = GuestPool::new(3);
        pool.remove(1);
        pool.remove(2);
        let assignment = assign_guest(
            &pool,
            Some(&RESERVATION),
            &SegmentValue::Amount(10_000),
            &mut ScriptedSource::default(),
        );
        assert_eq!(assignment, Ok(GuestAssignment { guest: 3, reserved: false }));
    }

    #[test]
    fn test_empty_pool_is_exhausted() {
        let pool = GuestPool::new(0);
        let assignment = assign_guest(&pool, None, &SegmentValue::Amount(10_000), &mut ScriptedSource::default());
        assert_eq!(assignment, Err(WheelError::ExhaustedGuests));
    }
}
