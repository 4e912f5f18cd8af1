use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_TURNS, COMPACT_VIEWPORT_MAX_WIDTH, CURRENCY_GLYPH, GRAND_TIER_THRESHOLD,
    MAJOR_TIER_THRESHOLD, MINOR_TIER_THRESHOLD, SEGMENT_PALETTE,
};

/// Colour band of a cash prize, used for the reveal card.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PrizeTier {
    Grand,
    Major,
    Minor,
    Standard,
}

impl PrizeTier {
    pub fn classify(amount: u64) -> Self {
        if amount >= GRAND_TIER_THRESHOLD {
            Self::Grand
        } else if amount >= MAJOR_TIER_THRESHOLD {
            Self::Major
        } else if amount >= MINOR_TIER_THRESHOLD {
            Self::Minor
        } else {
            Self::Standard
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Grand => "#ffd700",
            Self::Major => "#ff0033",
            Self::Minor => "#8a001a",
            Self::Standard => "#2b2b2b",
        }
    }
}

/// Remaining session time as `M:SS`.
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Full amount with thousands separators, e.g. `₦300,000`.
pub fn format_currency(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", CURRENCY_GLYPH, grouped)
}

/// Short form for narrow screens: `₦300K`, `₦1.5K`. Amounts under a
/// thousand are shown in full.
pub fn format_compact_currency(amount: u64) -> String {
    if amount < 1_000 {
        return format_currency(amount);
    }
    // Truncated to one decimal, never rounded up into the next thousand.
    let (thousands, tenths) = (amount / 1_000, amount % 1_000 / 100);
    if tenths == 0 {
        format!("{}{}K", CURRENCY_GLYPH, thousands)
    } else {
        format!("{}{}.{}K", CURRENCY_GLYPH, thousands, tenths)
    }
}

pub fn format_prize(amount: u64, viewport_width: u32) -> String {
    if viewport_width <= COMPACT_VIEWPORT_MAX_WIDTH {
        format_compact_currency(amount)
    } else {
        format_currency(amount)
    }
}

pub fn segment_color(index: usize) -> &'static str {
    SEGMENT_PALETTE[index % SEGMENT_PALETTE.len()]
}

/// Angle in degrees from the top of the wheel to the centre of a slice.
pub fn label_angle(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (360.0 / total as f64) * (index as f64 + 0.5)
}

/// New absolute wheel rotation that spins `BASE_TURNS` full turns from
/// `current` and stops with the pointer on the centre of `target`.
pub fn spin_rotation(current: f64, target: usize, total: usize) -> f64 {
    if total == 0 {
        return current;
    }
    let slice = 360.0 / total as f64;
    let target_angle = 360.0 - (target as f64 * slice + slice / 2.0);
    let resting = current.rem_euclid(360.0);
    let delta = (target_angle - resting).rem_euclid(360.0);
    current + BASE_TURNS as f64 * 360.0 + delta
}
