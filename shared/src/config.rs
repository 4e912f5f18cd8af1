use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use crate::catalog::{Classification, SegmentSpec, SegmentValue};
use crate::constants::{
    BLOCK_SIZE, CLASSIC_WINS_PER_BLOCK, GLOBAL_WIN_CAP, ONE_TIME_WINS_PER_BLOCK,
    SESSIONS_PER_RUN, SESSION_DURATION_SECS, SPECIAL_GUEST_ID, SPECIAL_GUEST_PRIZE,
    SPECIAL_GUEST_SESSION, TOTAL_GUESTS,
};
use crate::guests::SpecialGuestReservation;

static ITEM_SEGMENTS: Lazy<Vec<SegmentSpec>> = Lazy::new(|| {
    vec![
        SegmentSpec::win("AirPods"),
        SegmentSpec::win("Mouse"),
        SegmentSpec::win("Powerbank"),
        SegmentSpec::win("Mousepad"),
        SegmentSpec::win("Speaker"),
        SegmentSpec::win("Bottle"),
        SegmentSpec::lose("Better luck next time"),
        SegmentSpec::lose("Try again"),
        SegmentSpec::lose("₦0"),
    ]
});

const PRIZE_AMOUNTS: [u64; 12] = [
    500_000, 300_000, 200_000, 150_000, 100_000, 100_000,
    50_000, 50_000, 50_000, 25_000, 25_000, 10_000,
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Labelled win/lose slices that can come up again and again.
    #[default]
    Classified,
    /// Cash prizes, each slot awarded at most once per session.
    PrizePool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BlockQuota {
    pub block_size: usize,
    pub wins_per_block: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SessionReservation {
    pub session: u32,
    pub guest_id: u32,
    pub required_amount: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WheelVariant {
    Classic,
    OneTimeItems,
    PrizePool,
    SpecialGuest,
}

impl WheelVariant {
    pub fn config(&self) -> WheelConfig {
        match self {
            Self::Classic => WheelConfig::classic(),
            Self::OneTimeItems => WheelConfig::one_time_items(),
            Self::PrizePool => WheelConfig::prize_pool(),
            Self::SpecialGuest => WheelConfig::prize_pool_with_special_guest(),
        }
    }
}

/// Everything that distinguishes one wheel from another.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_wheel_config", skip_on_field_errors = true))]
pub struct WheelConfig {
    #[serde(default)]
    pub kind: CatalogKind,
    #[validate(length(min = 1))]
    pub segments: Vec<SegmentSpec>,
    #[serde(default)]
    pub shuffle_each_session: bool,
    #[serde(default)]
    pub block_quota: Option<BlockQuota>,
    #[serde(default)]
    pub global_win_cap: Option<u32>,
    #[serde(default)]
    pub total_guests: Option<u32>,
    #[serde(default)]
    pub reservations: Vec<SessionReservation>,
    #[serde(default = "default_session_duration")]
    #[validate(range(min = 1))]
    pub session_duration_secs: u64,
    #[serde(default = "default_session_count")]
    #[validate(range(min = 1))]
    pub session_count: u32,
}

fn default_session_duration() -> u64 {
    SESSION_DURATION_SECS
}

fn default_session_count() -> u32 {
    SESSIONS_PER_RUN
}

impl WheelConfig {
    /// The nine-slice item wheel: two forced wins per ten spins, losses only
    /// after fifteen wins.
    pub fn classic() -> Self {
        Self {
            kind: CatalogKind::Classified,
            segments: ITEM_SEGMENTS.clone(),
            shuffle_each_session: false,
            block_quota: Some(BlockQuota {
                block_size: BLOCK_SIZE,
                wins_per_block: CLASSIC_WINS_PER_BLOCK,
            }),
            global_win_cap: Some(GLOBAL_WIN_CAP),
            total_guests: None,
            reservations: Vec::new(),
            session_duration_secs: SESSION_DURATION_SECS,
            session_count: SESSIONS_PER_RUN,
        }
    }

    /// Item wheel where the AirPods can only be won once per run.
    pub fn one_time_items() -> Self {
        let mut config = Self::classic();
        for spec in config.segments.iter_mut() {
            if spec.value == SegmentValue::Label("AirPods".to_string()) {
                spec.one_time_only = true;
            }
        }
        config.block_quota = Some(BlockQuota {
            block_size: BLOCK_SIZE,
            wins_per_block: ONE_TIME_WINS_PER_BLOCK,
        });
        config
    }

    /// Cash prizes drawn for numbered guests, reshuffled every session.
    pub fn prize_pool() -> Self {
        Self {
            kind: CatalogKind::PrizePool,
            segments: PRIZE_AMOUNTS.iter().map(|&amount| SegmentSpec::prize(amount)).collect(),
            shuffle_each_session: true,
            block_quota: None,
            global_win_cap: None,
            total_guests: Some(TOTAL_GUESTS),
            reservations: Vec::new(),
            session_duration_secs: SESSION_DURATION_SECS,
            session_count: SESSIONS_PER_RUN,
        }
    }

    pub fn prize_pool_with_special_guest() -> Self {
        let mut config = Self::prize_pool();
        config.reservations.push(SessionReservation {
            session: SPECIAL_GUEST_SESSION,
            guest_id: SPECIAL_GUEST_ID,
            required_amount: SPECIAL_GUEST_PRIZE,
        });
        config
    }

    pub fn reservation_for(&self, session: u32) -> Option<SpecialGuestReservation> {
        self.reservations
            .iter()
            .find(|r| r.session == session)
            .map(|r| SpecialGuestReservation {
                guest_id: r.guest_id,
                required_amount: r.required_amount,
            })
    }
}

fn validate_wheel_config(config: &WheelConfig) -> Result<(), ValidationError> {
    let has_losing = config
        .segments
        .iter()
        .any(|s| s.classification == Classification::Lose);

    if let Some(quota) = config.block_quota {
        if quota.block_size == 0 {
            return Err(ValidationError::new("empty_block"));
        }
        if quota.wins_per_block > quota.block_size {
            return Err(ValidationError::new("quota_exceeds_block"));
        }
        if !has_losing && quota.wins_per_block < quota.block_size {
            return Err(ValidationError::new("quota_without_losing_segment"));
        }
    }

    if config.kind == CatalogKind::PrizePool
        && config
            .segments
            .iter()
            .any(|s| s.value.amount().is_none() || s.classification != Classification::Win)
    {
        return Err(ValidationError::new("prize_pool_requires_winning_amounts"));
    }

    let mut sessions = BTreeSet::new();
    for reservation in &config.reservations {
        let in_range = config
            .total_guests
            .map(|total| (1..=total).contains(&reservation.guest_id))
            .unwrap_or(false);
        if !in_range {
            return Err(ValidationError::new("reservation_guest_out_of_range"));
        }
        if !sessions.insert(reservation.session) {
            return Err(ValidationError::new("duplicate_session_reservation"));
        }
    }

    Ok(())
}
