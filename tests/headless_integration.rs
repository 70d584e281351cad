use std::sync::mpsc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use sumgrid::config::GameConfig;
use sumgrid::runtime::{FixedTicker, GameEvent, Runner, TestEventSource};
use sumgrid::scores::HighScores;
use sumgrid::session::{Activation, GameSession};
use sumgrid::store::MemoryKvStore;

fn seeded_session(config: GameConfig, seed: u64) -> GameSession {
    let store = MemoryKvStore::new();
    let high_scores = HighScores::new(Box::new(store));
    let rng: Box<dyn RngCore> = Box::new(StdRng::seed_from_u64(seed));
    GameSession::with_parts(config, high_scores, rng, None)
}

// Headless integration using the internal runtime + GameSession without a TTY.
// Cell indices travel through the event channel the way key/mouse input
// would in the real app.
#[test]
fn headless_round_flow_completes() {
    let mut session = seeded_session(GameConfig::default(), 42);
    session.start(GameConfig::default());

    // Channel for the test event source; a Resize stands in for "any
    // non-activation event" and cell activations ride on Tick gaps.
    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(5));
    let runner = Runner::new(es, ticker);

    tx.send(GameEvent::Resize).unwrap();

    // Drive a tiny event loop: on every tick activate the next solution cell
    let solution = session.round().solution_idxs.clone();
    let mut next = 0usize;
    let mut advanced = false;
    for _ in 0..100u32 {
        match runner.step() {
            GameEvent::Tick => {
                if next < solution.len() {
                    let outcome = session.activate_cell(solution[next]);
                    next += 1;
                    if let Activation::Correct(token) = outcome {
                        assert_eq!(session.score(), 1);
                        assert!(session.finish_advance(token));
                        advanced = true;
                        break;
                    }
                }
            }
            GameEvent::Resize => {}
            GameEvent::Key(_) | GameEvent::Mouse(_) => {}
        }
    }

    assert!(advanced, "solution picks should resolve the round");
    assert!(session.selected_idxs().is_empty());
    assert!(session.is_running());
}

#[test]
fn headless_timed_session_finishes_by_time() {
    let config = GameConfig {
        seconds: 3,
        ..Default::default()
    };
    let mut session = seeded_session(config, 7);
    session.start(config);

    let (_tx, rx) = std::sync::mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(2));
    let runner = Runner::new(es, ticker);

    for _ in 0..10u32 {
        if let GameEvent::Tick = runner.step() {
            session.tick();
        }
        if session.is_ended() {
            break;
        }
    }

    assert!(session.is_ended(), "timed session should finish by timeout");
    assert_eq!(session.time_left(), 0);
}

#[test]
fn headless_advance_token_resolves_exactly_once() {
    let config = GameConfig::default();
    let mut session = seeded_session(config, 11);
    session.start(config);

    let solution = session.round().solution_idxs.clone();
    let mut token = None;
    for &idx in &solution {
        if let Activation::Correct(t) = session.activate_cell(idx) {
            token = Some(t);
        }
    }
    let token = token.expect("solution picks must match");

    // The token resolves exactly once
    assert!(session.finish_advance(token));
    assert!(!session.finish_advance(token));
}
