use crate::config::GameConfig;
use crate::history::{SessionDb, SessionRecord};
use crate::round::{generate_round, Round};
use crate::scores::HighScores;
use chrono::Local;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Ended,
}

/// Handle for the deferred advance after a correct guess. Bound to the round
/// it was issued for; a token from a superseded round resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceToken {
    serial: u64,
}

/// What a cell activation did, for the caller to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// not running, out of range, at capacity, or frozen by a pending advance
    Ignored,
    Selected,
    Deselected,
    /// selection filled and matched the target; resolve the token after the
    /// "correct" transient to move to the next round
    Correct(AdvanceToken),
    /// selection filled and missed the target
    Incorrect,
}

/// Owns one play session: the live round, the selection, score, countdown
/// and phase. All transitions go through the methods below, one at a time;
/// there is exactly one live round and the selection always refers to it.
pub struct GameSession {
    config: GameConfig,
    round: Round,
    selected_idxs: Vec<usize>,
    score: u32,
    time_left: u32,
    phase: Phase,
    best: u32,
    round_serial: u64,
    rounds_generated: u64,
    pending_advance: Option<u64>,
    rng: Box<dyn RngCore>,
    high_scores: HighScores,
    history: Option<SessionDb>,
}

impl GameSession {
    pub fn new(config: GameConfig, high_scores: HighScores) -> Self {
        let rng: Box<dyn RngCore> = Box::new(StdRng::from_entropy());
        let history = SessionDb::new().ok();
        Self::with_parts(config, high_scores, rng, history)
    }

    /// Fully injectable constructor; tests seed the rng and drop the db.
    pub fn with_parts(
        config: GameConfig,
        high_scores: HighScores,
        mut rng: Box<dyn RngCore>,
        history: Option<SessionDb>,
    ) -> Self {
        let config = config.clamped();
        let round = generate_round(&config, &mut *rng);
        let best = high_scores.best_for(&config);
        Self {
            config,
            round,
            selected_idxs: Vec::new(),
            score: 0,
            time_left: config.seconds,
            phase: Phase::Idle,
            best,
            round_serial: 0,
            rounds_generated: 1,
            pending_advance: None,
            rng,
            high_scores,
            history,
        }
    }

    /// Idle/Ended -> Running with a fresh round and reset counters.
    pub fn start(&mut self, config: GameConfig) {
        self.config = config.clamped();
        self.score = 0;
        self.selected_idxs.clear();
        self.time_left = self.config.seconds;
        self.pending_advance = None;
        self.best = self.high_scores.best_for(&self.config);
        self.next_round();
        self.phase = Phase::Running;
    }

    /// One second of countdown. On zero the session ends, selection freezes
    /// and the high score is reconciled exactly once.
    pub fn tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.phase = Phase::Ended;
            self.pending_advance = None;
            self.finish_session();
        }
    }

    /// Select or deselect a cell. Only meaningful while running; activations
    /// during the correct-guess transient, outside the grid, or against a
    /// full selection are ignored.
    pub fn activate_cell(&mut self, idx: usize) -> Activation {
        if self.phase != Phase::Running || self.pending_advance.is_some() {
            return Activation::Ignored;
        }
        if idx >= self.round.cells() {
            return Activation::Ignored;
        }
        if let Some(pos) = self.selected_idxs.iter().position(|&s| s == idx) {
            self.selected_idxs.remove(pos);
            return Activation::Deselected;
        }
        if self.selected_idxs.len() >= self.config.picks_count as usize {
            return Activation::Ignored;
        }
        self.selected_idxs.push(idx);
        if self.selected_idxs.len() < self.config.picks_count as usize {
            return Activation::Selected;
        }
        self.evaluate()
    }

    fn evaluate(&mut self) -> Activation {
        if self.round.sum_of(&self.selected_idxs) == self.round.target {
            self.score += 1;
            self.pending_advance = Some(self.round_serial);
            Activation::Correct(AdvanceToken {
                serial: self.round_serial,
            })
        } else {
            self.selected_idxs.clear();
            if self.config.wrong_mode == crate::config::WrongMode::Reroll {
                self.next_round();
            }
            Activation::Incorrect
        }
    }

    /// Resolve a correct-guess token after the transient delay. Returns
    /// whether the board actually advanced; stale tokens (reset, new round,
    /// session over) do nothing.
    pub fn finish_advance(&mut self, token: AdvanceToken) -> bool {
        if self.phase != Phase::Running || self.pending_advance != Some(token.serial) {
            return false;
        }
        self.pending_advance = None;
        self.selected_idxs.clear();
        self.next_round();
        true
    }

    /// Running/Ended -> Idle. Leaving a live session with any elapsed play
    /// still reconciles the high score.
    pub fn stop(&mut self) {
        if self.phase == Phase::Running && self.elapsed() > 0 {
            self.finish_session();
        }
        self.phase = Phase::Idle;
        self.time_left = self.config.seconds;
        self.selected_idxs.clear();
        self.pending_advance = None;
    }

    fn finish_session(&mut self) {
        self.best = self.high_scores.update_if_best(&self.config, self.score);
        if let Some(db) = &self.history {
            let _ = db.record(&SessionRecord {
                played_at: Local::now(),
                fingerprint: self.config.fingerprint(),
                score: self.score,
                best: self.best,
            });
        }
    }

    fn next_round(&mut self) {
        self.round = generate_round(&self.config, &mut *self.rng);
        self.round_serial += 1;
        self.rounds_generated += 1;
    }

    pub fn elapsed(&self) -> u32 {
        self.config.seconds.saturating_sub(self.time_left)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn selected_idxs(&self) -> &[usize] {
        &self.selected_idxs
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Best for the active config; refreshed on start and on session end.
    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn advance_pending(&self) -> bool {
        self.pending_advance.is_some()
    }

    /// Total rounds generated since construction (regeneration counter).
    pub fn rounds_generated(&self) -> u64 {
        self.rounds_generated
    }

    pub fn history(&self) -> Option<&SessionDb> {
        self.history.as_ref()
    }
}
