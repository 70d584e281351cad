use crate::config::GameConfig;
use rand::Rng;

pub const CELL_MIN: u8 = 0;
pub const CELL_MAX: u8 = 9;

/// One board: grid values, the target sum, and the indices of a subset that
/// is guaranteed to hit the target. Immutable once generated; a new round
/// supersedes it, nothing ever mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub size: u8,
    pub numbers: Vec<u8>,
    pub target: u32,
    pub solution_idxs: Vec<usize>,
}

impl Round {
    pub fn cells(&self) -> usize {
        self.numbers.len()
    }

    pub fn sum_of(&self, idxs: &[usize]) -> u32 {
        idxs.iter().map(|&i| self.numbers[i] as u32).sum()
    }
}

/// Generate a round with a guaranteed solution (solution-first scheme).
///
/// The target is drawn from `[1, min(target_max, picks * 9)]`, then the
/// solution cells are filled front-to-back, each value constrained to the
/// range that keeps the remainder reachable by the slots left. The last
/// slot absorbs the exact remainder, so the realized sum always equals the
/// target. Every other cell is independent uniform noise; accidental extra
/// solutions are fine, only existence is promised.
pub fn generate_round<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Round {
    let cells = config.cells();
    let picks = config.picks_count as usize;
    debug_assert!(picks <= cells);

    let solution_idxs = rand::seq::index::sample(rng, cells, picks).into_vec();

    let target_ceiling = config.target_max.min(picks as u32 * CELL_MAX as u32);
    debug_assert!(target_ceiling >= 1);
    let target = rng.gen_range(1..=target_ceiling);

    let mut numbers = vec![0u8; cells];
    let mut remaining = target;
    for (i, &idx) in solution_idxs.iter().enumerate() {
        let slots_after = (picks - 1 - i) as u32;
        let lo = remaining.saturating_sub(CELL_MAX as u32 * slots_after);
        let hi = remaining.min(CELL_MAX as u32);
        debug_assert!(lo <= hi, "infeasible slot: remaining {remaining}, slots {slots_after}");
        let value = if slots_after == 0 {
            remaining
        } else {
            rng.gen_range(lo..=hi)
        };
        numbers[idx] = value as u8;
        remaining -= value;
    }
    debug_assert_eq!(remaining, 0);

    for (idx, cell) in numbers.iter_mut().enumerate() {
        if !solution_idxs.contains(&idx) {
            *cell = rng.gen_range(CELL_MIN..=CELL_MAX);
        }
    }

    let round = Round {
        size: config.grid_size,
        numbers,
        target,
        solution_idxs,
    };
    debug_assert_eq!(round.sum_of(&round.solution_idxs), round.target);
    round
}
