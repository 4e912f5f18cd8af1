//! Spin outcome allocation.
//!
//! A spin happens in two phases. [`SpinAllocator::decide`] picks the target
//! slice and, for a win, the guest who receives it, without touching any
//! bookkeeping. The caller animates the wheel toward the target and then
//! hands the [`PendingSpin`] back to [`SpinAllocator::commit`], which applies
//! every ledger, pool and quota update together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumString};
use validator::Validate;

use crate::block_quota::BlockQuotaTracker;
use crate::catalog::{Catalog, Classification, Segment, SegmentValue};
use crate::config::{CatalogKind, WheelConfig};
use crate::display::PrizeTier;
use crate::error::WheelError;
use crate::guests::{assign_guest, GuestAssignment, GuestPool};
use crate::rng::{choose, IndexSource, RandSource};
use crate::session::{Countdown, Session, SessionTick, WinLedger};

/// Operator override for the next spins.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForceOutcome {
    #[default]
    Auto,
    Win,
    Lose,
}

/// Which rule chose the target.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Forced,
    /// A forced outcome had no matching slice; the first eligible one was used.
    ForcedFallback,
    CapReached,
    QuotaWin,
    QuotaLose,
    Open,
}

/// A decided spin waiting for its reveal. Consumed by `commit` or `abandon`,
/// so a decision can be applied at most once.
#[derive(Debug)]
pub struct PendingSpin {
    spin_id: u64,
    epoch: u64,
    target: usize,
    segment: Segment,
    guest: Option<GuestAssignment>,
    mode: SelectionMode,
}

impl PendingSpin {
    pub fn spin_id(&self) -> u64 {
        self.spin_id
    }

    /// Catalog index the wheel should stop on.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn guest(&self) -> Option<GuestAssignment> {
        self.guest
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_win(&self) -> bool {
        self.segment.is_win()
    }
}

/// Finalized outcome of a spin, handed to the presentation layer.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SpinResult {
    pub spin_id: u64,
    pub session: u32,
    pub index: usize,
    pub value: SegmentValue,
    pub is_win: bool,
    pub guest_number: Option<u32>,
    pub prize_tier: Option<PrizeTier>,
    pub mode: SelectionMode,
}

impl SpinResult {
    pub fn amount(&self) -> Option<u64> {
        self.value.amount()
    }
}

/// Owns all state of one run: the guest pool, global counters and the
/// current session.
pub struct SpinAllocator<R: IndexSource = RandSource> {
    config: WheelConfig,
    source: R,
    guests: Option<GuestPool>,
    total_wins: u32,
    claimed_once: BTreeSet<usize>,
    session: Session,
    in_flight: Option<u64>,
    next_spin_id: u64,
    history: Vec<SpinResult>,
}

impl<R: IndexSource> SpinAllocator<R> {
    pub fn new(config: WheelConfig, mut source: R) -> Result<Self, WheelError> {
        config.validate()?;
        let session = open_session(&config, 1, 1, &mut source);
        let guests = config.total_guests.map(GuestPool::new);
        log::info!(
            "Wheel ready: {} segments, {} guests, session 1 of {}",
            session.catalog.len(),
            guests.as_ref().map(|g| g.total()).unwrap_or(0),
            config.session_count
        );
        Ok(Self {
            config,
            source,
            guests,
            total_wins: 0,
            claimed_once: BTreeSet::new(),
            session,
            in_flight: None,
            next_spin_id: 1,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn guests(&self) -> Option<&GuestPool> {
        self.guests.as_ref()
    }

    pub fn total_wins(&self) -> u32 {
        self.total_wins
    }

    pub fn history(&self) -> &[SpinResult] {
        &self.history
    }

    pub fn is_spinning(&self) -> bool {
        self.in_flight.is_some()
    }

    fn is_eligible(&self, index: usize, segment: &Segment) -> bool {
        if segment.one_time_only && self.claimed_once.contains(&segment.id) {
            return false;
        }
        !(self.config.kind == CatalogKind::PrizePool && self.session.ledger.contains(index))
    }

    fn eligible(&self, classification: Option<Classification>) -> Vec<usize> {
        self.session.catalog.indices_where(|index, segment| {
            classification.map_or(true, |c| segment.classification == c)
                && self.is_eligible(index, segment)
        })
    }

    fn select_target(&mut self, force: ForceOutcome) -> Result<(usize, SelectionMode), WheelError> {
        let wanted = match force {
            ForceOutcome::Win => Some(Classification::Win),
            ForceOutcome::Lose => Some(Classification::Lose),
            ForceOutcome::Auto => None,
        };

        if let Some(classification) = wanted {
            let candidates = self.eligible(Some(classification));
            if let Some(index) = choose(&mut self.source, &candidates) {
                return Ok((index, SelectionMode::Forced));
            }
            let fallback = self.eligible(None).first().copied().ok_or(WheelError::ExhaustedPool)?;
            log::warn!(
                "Forced {} outcome has no eligible segment; falling back to index {}",
                force,
                fallback
            );
            return Ok((fallback, SelectionMode::ForcedFallback));
        }

        let wins = self.eligible(Some(Classification::Win));
        let losses = self.eligible(Some(Classification::Lose));

        if let Some(cap) = self.config.global_win_cap {
            if self.total_wins >= cap {
                let index = choose(&mut self.source, &losses).ok_or(WheelError::ExhaustedPool)?;
                return Ok((index, SelectionMode::CapReached));
            }
        }

        if wins.is_empty() && losses.is_empty() {
            return Err(WheelError::ExhaustedPool);
        }

        if let Some(block) = &self.session.block {
            if block.is_win_slot() && !wins.is_empty() {
                let index = choose(&mut self.source, &wins).ok_or(WheelError::ExhaustedPool)?;
                return Ok((index, SelectionMode::QuotaWin));
            }
            let index = choose(&mut self.source, &losses).ok_or(WheelError::ExhaustedPool)?;
            return Ok((index, SelectionMode::QuotaLose));
        }

        let candidates = if wins.is_empty() { losses } else { self.eligible(None) };
        let index = choose(&mut self.source, &candidates).ok_or(WheelError::ExhaustedPool)?;
        Ok((index, SelectionMode::Open))
    }

    /// Chooses the next spin's target. Nothing but the in-flight marker
    /// changes until the returned spin is committed.
    pub fn decide(&mut self, force: ForceOutcome) -> Result<PendingSpin, WheelError> {
        if self.in_flight.is_some() {
            return Err(WheelError::Busy);
        }
        if self.session.is_expired() {
            return Err(WheelError::SessionExpired);
        }

        let (target, mode) = self.select_target(force)?;
        let segment = self
            .session
            .catalog
            .get(target)
            .cloned()
            .ok_or(WheelError::ExhaustedPool)?;

        let guest = match (&self.guests, segment.is_win()) {
            (Some(pool), true) => Some(assign_guest(
                pool,
                self.session.reservation.as_ref(),
                &segment.value,
                &mut self.source,
            )?),
            _ => None,
        };

        let spin_id = self.next_spin_id;
        self.next_spin_id += 1;
        self.in_flight = Some(spin_id);

        log::debug!(
            "Spin {} decided: index {} ({}) via {:?}",
            spin_id,
            target,
            segment.value,
            mode
        );

        Ok(PendingSpin {
            spin_id,
            epoch: self.session.epoch,
            target,
            segment,
            guest,
            mode,
        })
    }

    /// Applies a decided spin. Every check happens before the first update,
    /// so a refused commit leaves the run exactly as it was.
    pub fn commit(&mut self, pending: PendingSpin) -> Result<SpinResult, WheelError> {
        if pending.epoch != self.session.epoch || self.in_flight != Some(pending.spin_id) {
            return Err(WheelError::StaleSpin {
                spin_epoch: pending.epoch,
                current_epoch: self.session.epoch,
            });
        }
        if let (Some(pool), Some(assignment)) = (&self.guests, pending.guest) {
            if !pool.contains(assignment.guest) {
                self.in_flight = None;
                return Err(WheelError::ExhaustedGuests);
            }
        }

        let is_win = pending.is_win();
        if is_win {
            self.session.ledger.record(pending.target);
            if pending.segment.one_time_only {
                self.claimed_once.insert(pending.segment.id);
            }
            self.total_wins += 1;
        }
        if let (Some(pool), Some(assignment)) = (self.guests.as_mut(), pending.guest) {
            pool.remove(assignment.guest);
        }
        if let Some(block) = self.session.block.as_mut() {
            block.record(is_win, &mut self.source);
        }
        self.in_flight = None;

        let result = SpinResult {
            spin_id: pending.spin_id,
            session: self.session.number,
            index: pending.target,
            prize_tier: pending.segment.value.amount().map(PrizeTier::classify),
            value: pending.segment.value,
            is_win,
            guest_number: pending.guest.map(|g| g.guest),
            mode: pending.mode,
        };

        match result.guest_number {
            Some(guest) => log::info!(
                "Spin {}: guest {} wins {}{}",
                result.spin_id,
                guest,
                result.value,
                if pending.guest.map(|g| g.reserved).unwrap_or(false) { " (reserved)" } else { "" }
            ),
            None => log::info!(
                "Spin {}: {} ({})",
                result.spin_id,
                result.value,
                if is_win { "win" } else { "lose" }
            ),
        }

        self.history.push(result.clone());
        Ok(result)
    }

    /// Drops a decided spin without applying it.
    pub fn abandon(&mut self, pending: PendingSpin) {
        if self.in_flight == Some(pending.spin_id) {
            self.in_flight = None;
        }
    }

    pub fn tick(&mut self) -> SessionTick {
        let remaining_secs = self.session.countdown.tick();
        SessionTick {
            epoch: self.session.epoch,
            remaining_secs,
            expired: remaining_secs == 0,
        }
    }

    /// Moves to the next session. Any spin still in flight can no longer commit.
    pub fn next_session(&mut self) -> Result<u32, WheelError> {
        if let Some(spin_id) = self.in_flight.take() {
            log::info!("Spin {} cancelled by session change", spin_id);
        }
        let number = self.session.number + 1;
        if number > self.config.session_count {
            return Err(WheelError::RunComplete);
        }
        self.session = open_session(&self.config, number, self.session.epoch + 1, &mut self.source);
        log::info!(
            "Session {} started ({} segments, {} wins so far)",
            number,
            self.session.catalog.len(),
            self.total_wins
        );
        Ok(number)
    }
}

fn open_session(config: &WheelConfig, number: u32, epoch: u64, source: &mut impl IndexSource) -> Session {
    let catalog = Catalog::build(&config.segments, number, config.shuffle_each_session, source);
    let block = config
        .block_quota
        .map(|quota| BlockQuotaTracker::new(quota.block_size, quota.wins_per_block, source));
    Session {
        epoch,
        number,
        catalog,
        ledger: WinLedger::default(),
        block,
        reservation: config.reservation_for(number),
        countdown: Countdown::new(config.session_duration_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SegmentSpec;
    use crate::config::BlockQuota;
    use crate::rng::ScriptedSource;
    use std::collections::HashSet;

    fn seeded(config: WheelConfig, seed: u64) -> SpinAllocator {
        SpinAllocator::new(config, RandSource::seeded(seed)).expect("valid config")
    }

    fn spin<R: IndexSource>(allocator: &mut SpinAllocator<R>, force: ForceOutcome) -> Result<SpinResult, WheelError> {
        let pending = allocator.decide(force)?;
        allocator.commit(pending)
    }

    fn classic_without_cap() -> WheelConfig {
        let mut config = WheelConfig::classic();
        config.global_win_cap = None;
        config
    }

    #[test]
    fn test_block_quota_exact_wins() {
        for seed in 0..20 {
            let mut allocator = seeded(classic_without_cap(), seed);
            for _block in 0..5 {
                let wins = (0..10)
                    .map(|_| spin(&mut allocator, ForceOutcome::Auto).expect("spin"))
                    .filter(|r| r.is_win)
                    .count();
                assert_eq!(wins, 2, "seed {}", seed);
            }
        }
    }

    #[test]
    fn test_block_quota_three_wins_variant() {
        let mut config = WheelConfig::one_time_items();
        config.global_win_cap = None;
        config.segments.iter_mut().for_each(|s| s.one_time_only = false);
        let mut allocator = seeded(config, 77);
        for _ in 0..4 {
            let wins = (0..10)
                .filter_map(|_| spin(&mut allocator, ForceOutcome::Auto).ok())
                .filter(|r| r.is_win)
                .count();
            assert_eq!(wins, 3);
        }
    }

    #[test]
    fn test_global_cap_forces_losses() {
        let mut allocator = seeded(WheelConfig::classic(), 5);
        let mut results = Vec::new();
        for _ in 0..120 {
            results.push(spin(&mut allocator, ForceOutcome::Auto).expect("spin"));
        }
        assert_eq!(allocator.total_wins(), 15);
        let fifteenth = results
            .iter()
            .scan(0, |wins, r| {
                if r.is_win {
                    *wins += 1;
                }
                Some(*wins)
            })
            .position(|wins| wins == 15)
            .expect("cap reached");
        assert!(results[fifteenth + 1..].iter().all(|r| !r.is_win));
        assert!(results[fifteenth + 1..].iter().all(|r| r.mode == SelectionMode::CapReached));
    }

    #[test]
    fn test_global_cap_spans_sessions() {
        let mut allocator = seeded(WheelConfig::classic(), 8);
        while allocator.total_wins() < 15 {
            spin(&mut allocator, ForceOutcome::Win).expect("spin");
        }
        allocator.next_session().expect("second session");
        for _ in 0..20 {
            assert!(!spin(&mut allocator, ForceOutcome::Auto).expect("spin").is_win);
        }
    }

    #[test]
    fn test_forced_outcomes() {
        let mut allocator = seeded(WheelConfig::classic(), 2);
        for _ in 0..10 {
            assert!(spin(&mut allocator, ForceOutcome::Win).expect("spin").is_win);
            assert!(!spin(&mut allocator, ForceOutcome::Lose).expect("spin").is_win);
        }
    }

    #[test]
    fn test_forced_lose_without_losing_segment_falls_back() {
        let mut allocator = seeded(WheelConfig::prize_pool(), 3);
        let pending = allocator.decide(ForceOutcome::Lose).expect("fallback");
        assert_eq!(pending.mode(), SelectionMode::ForcedFallback);
        assert_eq!(pending.target(), 0);
        assert!(pending.is_win());
    }

    #[test]
    fn test_one_time_item_never_repeats() {
        let mut config = WheelConfig::one_time_items();
        config.global_win_cap = None;
        let mut allocator = seeded(config, 13);
        let mut airpods = 0;
        for _ in 0..2 {
            for _ in 0..200 {
                let result = spin(&mut allocator, ForceOutcome::Win).expect("spin");
                if result.value == SegmentValue::Label("AirPods".into()) {
                    airpods += 1;
                }
            }
            let _ = allocator.next_session();
        }
        assert_eq!(airpods, 1);
    }

    #[test]
    fn test_prize_slots_awarded_once_per_session() {
        let mut allocator = seeded(WheelConfig::prize_pool(), 21);
        let slots = allocator.session().catalog.len();
        let mut seen = HashSet::new();
        for _ in 0..slots {
            let result = spin(&mut allocator, ForceOutcome::Auto).expect("spin");
            assert!(seen.insert(result.index), "slot {} awarded twice", result.index);
        }
        assert_eq!(spin(&mut allocator, ForceOutcome::Auto), Err(WheelError::ExhaustedPool));
        assert!(!allocator.is_spinning());

        allocator.next_session().expect("second session");
        assert!(allocator.session().ledger.is_empty());
        assert!(spin(&mut allocator, ForceOutcome::Auto).is_ok());
    }

    #[test]
    fn test_guests_never_win_twice() {
        let mut allocator = seeded(WheelConfig::prize_pool_with_special_guest(), 34);
        let mut winners = HashSet::new();
        loop {
            match spin(&mut allocator, ForceOutcome::Auto) {
                Ok(result) => {
                    let guest = result.guest_number.expect("prize pool always assigns a guest");
                    assert!(winners.insert(guest), "guest {} won twice", guest);
                }
                Err(WheelError::ExhaustedPool) => match allocator.next_session() {
                    Ok(_) => continue,
                    Err(WheelError::RunComplete) => break,
                    Err(e) => panic!("unexpected {:?}", e),
                },
                Err(e) => panic!("unexpected {:?}", e),
            }
        }
        assert_eq!(winners.len(), 24);
        assert_eq!(allocator.guests().map(|g| g.len()), Some(300 - 24));
    }

    #[test]
    fn test_special_guest_receives_reserved_prize() {
        let mut allocator = seeded(WheelConfig::prize_pool_with_special_guest(), 55);
        let mut awarded = None;
        while let Ok(result) = spin(&mut allocator, ForceOutcome::Auto) {
            if result.guest_number == Some(262) {
                awarded = Some(result.clone());
            }
            if result.amount() == Some(50_000) {
                assert_eq!(result.guest_number, Some(262));
                break;
            }
        }
        let awarded = awarded.expect("guest 262 was awarded");
        assert_eq!(awarded.amount(), Some(50_000));
        assert_eq!(awarded.prize_tier, Some(PrizeTier::Minor));
    }

    #[test]
    fn test_special_guest_only_in_reserved_session() {
        let mut allocator = seeded(WheelConfig::prize_pool_with_special_guest(), 56);
        allocator.next_session().expect("second session");
        assert_eq!(allocator.session().reservation, None);
    }

    #[test]
    fn test_failed_guest_assignment_leaves_no_trace() {
        let mut config = WheelConfig::prize_pool();
        config.total_guests = Some(1);
        let mut allocator = SpinAllocator::new(config, ScriptedSource::default()).expect("valid config");

        let first = spin(&mut allocator, ForceOutcome::Auto).expect("one guest to award");
        assert_eq!(first.guest_number, Some(1));
        assert_eq!(allocator.total_wins(), 1);
        let ledger_before = allocator.session().ledger.clone();

        assert_eq!(allocator.decide(ForceOutcome::Auto).err(), Some(WheelError::ExhaustedGuests));
        assert_eq!(allocator.session().ledger, ledger_before);
        assert_eq!(allocator.total_wins(), 1);
        assert!(!allocator.is_spinning());
        assert_eq!(allocator.history().len(), 1);
    }

    #[test]
    fn test_second_decide_is_busy_and_single_commit() {
        let mut allocator = seeded(WheelConfig::classic(), 1);
        let pending = allocator.decide(ForceOutcome::Auto).expect("first spin");
        assert_eq!(allocator.decide(ForceOutcome::Auto).err(), Some(WheelError::Busy));
        assert!(allocator.is_spinning());
        allocator.commit(pending).expect("commit");
        assert_eq!(allocator.history().len(), 1);
        assert!(!allocator.is_spinning());
    }

    #[test]
    fn test_commit_after_session_change_is_stale() {
        let mut allocator = seeded(WheelConfig::prize_pool(), 9);
        let pending = allocator.decide(ForceOutcome::Auto).expect("spin");
        allocator.next_session().expect("second session");
        let err = allocator.commit(pending).expect_err("stale");
        assert_eq!(err, WheelError::StaleSpin { spin_epoch: 1, current_epoch: 2 });
        assert!(allocator.session().ledger.is_empty());
        assert_eq!(allocator.guests().map(|g| g.len()), Some(300));
        assert_eq!(allocator.total_wins(), 0);
    }

    #[test]
    fn test_abandon_releases_spin() {
        let mut allocator = seeded(WheelConfig::classic(), 4);
        let pending = allocator.decide(ForceOutcome::Auto).expect("spin");
        allocator.abandon(pending);
        assert!(!allocator.is_spinning());
        assert!(allocator.history().is_empty());
        assert!(allocator.decide(ForceOutcome::Auto).is_ok());
    }

    #[test]
    fn test_session_expiry_and_run_completion() {
        let mut config = WheelConfig::classic();
        config.session_duration_secs = 2;
        let mut allocator = seeded(config, 6);
        assert!(!allocator.tick().expired);
        let tick = allocator.tick();
        assert!(tick.expired);
        assert_eq!(tick.epoch, 1);
        assert_eq!(allocator.decide(ForceOutcome::Auto).err(), Some(WheelError::SessionExpired));
        assert_eq!(allocator.next_session(), Ok(2));
        assert_eq!(allocator.session().countdown.remaining_secs(), 2);
        assert_eq!(allocator.next_session(), Err(WheelError::RunComplete));
    }

    #[test]
    fn test_run_completion_releases_spin_in_flight() {
        let mut config = WheelConfig::classic();
        config.session_count = 1;
        let mut allocator = seeded(config, 8);
        let pending = allocator.decide(ForceOutcome::Auto).expect("spin");
        drop(pending);
        assert!(allocator.is_spinning());
        assert_eq!(allocator.next_session(), Err(WheelError::RunComplete));
        assert!(!allocator.is_spinning());
        assert!(allocator.history().is_empty());
    }

    #[test]
    fn test_no_winning_segment_forces_loss() {
        let config = WheelConfig {
            segments: vec![SegmentSpec::win("Crown").once(), SegmentSpec::lose("Try again")],
            block_quota: Some(BlockQuota { block_size: 10, wins_per_block: 10 }),
            global_win_cap: None,
            ..WheelConfig::classic()
        };
        let mut allocator = seeded(config, 12);
        assert!(spin(&mut allocator, ForceOutcome::Auto).expect("spin").is_win);
        for _ in 0..9 {
            let result = spin(&mut allocator, ForceOutcome::Auto).expect("spin");
            assert!(!result.is_win);
            assert_eq!(result.mode, SelectionMode::QuotaLose);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = WheelConfig::classic();
        config.segments.clear();
        assert!(matches!(
            SpinAllocator::new(config, RandSource::seeded(0)),
            Err(WheelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_result_serializes() {
        let mut allocator = seeded(WheelConfig::prize_pool(), 17);
        let result = spin(&mut allocator, ForceOutcome::Auto).expect("spin");
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["is_win"], true);
        assert!(json["guest_number"].is_u64());
        assert!(json["value"]["amount"].is_u64());
    }
}
