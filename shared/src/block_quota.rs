use serde::Serialize;
use std::collections::BTreeSet;

use crate::rng::{sample_positions, IndexSource};

/// Tracks progress through a rolling block of spins in which a fixed number
/// of positions, drawn when the block opens, must land on a win.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockQuotaTracker {
    block_size: usize,
    wins_per_block: usize,
    position: usize,
    wins_in_block: usize,
    win_positions: BTreeSet<usize>,
    blocks_completed: u32,
}

impl BlockQuotaTracker {
    pub fn new(block_size: usize, wins_per_block: usize, source: &mut impl IndexSource) -> Self {
        let mut tracker = Self {
            block_size,
            wins_per_block,
            position: 0,
            wins_in_block: 0,
            win_positions: BTreeSet::new(),
            blocks_completed: 0,
        };
        tracker.open_block(source);
        tracker
    }

    fn open_block(&mut self, source: &mut impl IndexSource) {
        self.position = 0;
        self.wins_in_block = 0;
        self.win_positions = sample_positions(source, self.block_size, self.wins_per_block);
    }

    /// Whether the next spin is one of the block's forced wins.
    pub fn is_win_slot(&self) -> bool {
        self.win_positions.contains(&self.position)
    }

    /// Advances past one spin. Returns true when the spin closed the block,
    /// in which case the next block's positions have already been drawn.
    pub fn record(&mut self, is_win: bool, source: &mut impl IndexSource) -> bool {
        self.position += 1;
        if is_win {
            self.wins_in_block += 1;
        }
        if self.position >= self.block_size {
            log::debug!(
                "Block {} closed with {}/{} wins",
                self.blocks_completed + 1,
                self.wins_in_block,
                self.wins_per_block
            );
            self.blocks_completed += 1;
            self.open_block(source);
            return true;
        }
        false
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn wins_in_block(&self) -> usize {
        self.wins_in_block
    }

    pub fn win_positions(&self) -> &BTreeSet<usize> {
        &self.win_positions
    }

    pub fn blocks_completed(&self) -> u32 {
        self.blocks_completed
    }

    pub fn wins_per_block(&self) -> usize {
        self.wins_per_block
    }
}
