use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

use crate::display::format_currency;
use crate::rng::{shuffle, IndexSource};

/// What a wheel slice shows: an item label or a cash prize.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentValue {
    Label(String),
    Amount(u64),
}

impl SegmentValue {
    pub fn amount(&self) -> Option<u64> {
        match self {
            Self::Amount(amount) => Some(*amount),
            Self::Label(_) => None,
        }
    }
}

impl fmt::Display for SegmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{}", label),
            Self::Amount(amount) => write!(f, "{}", format_currency(*amount)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    Win,
    Lose,
}

/// Configuration form of a slice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SegmentSpec {
    pub value: SegmentValue,
    pub classification: Classification,
    #[serde(default)]
    pub one_time_only: bool,
}

impl SegmentSpec {
    pub fn win(label: &str) -> Self {
        Self {
            value: SegmentValue::Label(label.to_string()),
            classification: Classification::Win,
            one_time_only: false,
        }
    }

    pub fn lose(label: &str) -> Self {
        Self {
            value: SegmentValue::Label(label.to_string()),
            classification: Classification::Lose,
            one_time_only: false,
        }
    }

    pub fn prize(amount: u64) -> Self {
        Self {
            value: SegmentValue::Amount(amount),
            classification: Classification::Win,
            one_time_only: false,
        }
    }

    pub fn once(mut self) -> Self {
        self.one_time_only = true;
        self
    }
}

/// A slice of a built catalog. `id` is the slice's position in the
/// configured list and stays stable when the catalog is reshuffled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Segment {
    pub id: usize,
    pub value: SegmentValue,
    pub classification: Classification,
    pub one_time_only: bool,
    pub session: Option<u32>,
}

impl Segment {
    pub fn is_win(&self) -> bool {
        self.classification == Classification::Win
    }
}

/// The ordered slices of one session's wheel. Fixed in size and content for
/// the lifetime of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    segments: Vec<Segment>,
}

impl Catalog {
    pub fn build(
        specs: &[SegmentSpec],
        session: u32,
        reshuffle: bool,
        source: &mut impl IndexSource,
    ) -> Self {
        let mut segments: Vec<Segment> = specs
            .iter()
            .enumerate()
            .map(|(id, spec)| Segment {
                id,
                value: spec.value.clone(),
                classification: spec.classification,
                one_time_only: spec.one_time_only,
                session: Some(session),
            })
            .collect();
        if reshuffle {
            shuffle(source, &mut segments);
        }
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Catalog indices whose slice satisfies `keep`, in wheel order.
    pub fn indices_where(&self, mut keep: impl FnMut(usize, &Segment) -> bool) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(index, segment)| keep(*index, segment))
            .map(|(index, _)| index)
            .collect()
    }
}
