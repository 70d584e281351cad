mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Position, Rect},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc,
    thread,
    time::Duration,
};

use sumgrid::config::{
    allowed_picks, allowed_target_max, load_config, save_config, ControlMode, GameConfig,
    WrongMode, CONTROL_MODE_OPTIONS, GRID_SIZE_OPTIONS, SECONDS_OPTIONS, WRONG_MODE_OPTIONS,
};
use sumgrid::history::SessionDb;
use sumgrid::presets::{AddError, PresetStore};
use sumgrid::runtime::GameEvent;
use sumgrid::scores::HighScores;
use sumgrid::session::{Activation, AdvanceToken, GameSession};
use sumgrid::store::{reset_all_data, FileKvStore, KvStore};
use sumgrid::util::{cell_index, row_col};

const TICK_RATE_MS: u64 = 100;
const TICKS_PER_SECOND: u8 = 10;
/// ~0.5s of "correct!" before the board advances
const TRANSIENT_TICKS: u8 = 5;

/// casual arithmetic grid puzzle tui
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Pick cells on a digit grid so their sum hits the target before the clock runs out. Settings, per-mode high scores and presets persist between runs."
)]
pub struct Cli {
    /// board dimension (3, 4 or 5)
    #[clap(short = 'g', long)]
    grid_size: Option<u8>,

    /// cells to pick per round
    #[clap(short = 'k', long)]
    picks: Option<u8>,

    /// upper bound for generated target sums
    #[clap(short = 't', long)]
    target_max: Option<u32>,

    /// countdown seconds per session
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// board policy after a wrong guess
    #[clap(short = 'w', long, value_enum)]
    wrong_mode: Option<WrongMode>,

    /// input mode
    #[clap(short = 'c', long, value_enum)]
    control_mode: Option<ControlMode>,

    /// deterministic seed for round generation
    #[clap(long)]
    seed: Option<u64>,

    /// alternate key-value store file
    #[clap(long)]
    store: Option<PathBuf>,

    /// dump session history as csv to a file and exit
    #[clap(long)]
    export_history: Option<PathBuf>,
}

impl Cli {
    /// Layer CLI overrides on top of the persisted configuration.
    fn apply_to(&self, mut cfg: GameConfig) -> GameConfig {
        if let Some(g) = self.grid_size {
            cfg.grid_size = g;
        }
        if let Some(k) = self.picks {
            cfg.picks_count = k;
        }
        if let Some(t) = self.target_max {
            cfg.target_max = t;
        }
        if let Some(s) = self.seconds {
            cfg.seconds = s;
        }
        if let Some(w) = self.wrong_mode {
            cfg.wrong_mode = w;
        }
        if let Some(c) = self.control_mode {
            cfg.control_mode = c;
        }
        cfg.clamped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Settings,
    Playing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Control = 0,
    GridSize,
    Picks,
    TargetMax,
    Seconds,
    WrongMode,
}

pub const SETTINGS_ROWS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy)]
pub struct Flash {
    pub kind: FlashKind,
    pub ticks: u8,
}

fn cycle<T: Copy + PartialEq>(options: &[T], current: T, dir: i32) -> T {
    let idx = options.iter().position(|&o| o == current).unwrap_or(0) as i32;
    let len = options.len() as i32;
    options[(idx + dir).rem_euclid(len) as usize]
}

pub struct App {
    pub config: GameConfig,
    pub session: GameSession,
    pub presets: PresetStore,
    pub scores: HighScores,
    pub store: Box<dyn KvStore>,
    pub state: AppState,
    pub settings_cursor: usize,
    pub focus: usize,
    pub flash: Option<Flash>,
    pub pending: Option<(AdvanceToken, u8)>,
    pub tick_in_second: u8,
    pub pending_delete: bool,
    pub status: Option<String>,
    pub grid_rects: Vec<Rect>,
}

impl App {
    pub fn new<S: KvStore + Clone + 'static>(
        config: GameConfig,
        store: S,
        seed: Option<u64>,
    ) -> Self {
        let presets = PresetStore::new(Box::new(store.clone()));
        let scores = HighScores::new(Box::new(store.clone()));
        let session_scores = HighScores::new(Box::new(store.clone()));
        let rng: Box<dyn RngCore> = match seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(StdRng::from_entropy()),
        };
        let session =
            GameSession::with_parts(config, session_scores, rng, SessionDb::new().ok());

        Self {
            config,
            session,
            presets,
            scores,
            store: Box::new(store),
            state: AppState::Settings,
            settings_cursor: 0,
            focus: 0,
            flash: None,
            pending: None,
            tick_in_second: 0,
            pending_delete: false,
            status: None,
            grid_rects: Vec::new(),
        }
    }

    pub fn start_session(&mut self) {
        self.session.start(self.config);
        self.state = AppState::Playing;
        self.focus = 0;
        self.tick_in_second = 0;
        self.flash = None;
        self.pending = None;
        self.status = None;
    }

    pub fn stop_to_settings(&mut self) {
        self.session.stop();
        self.state = AppState::Settings;
        self.flash = None;
        self.pending = None;
    }

    /// One 100ms tick: advance the transient timers, and every tenth tick
    /// one second of session countdown.
    pub fn on_tick(&mut self) {
        if self.state != AppState::Playing {
            return;
        }

        if let Some(flash) = self.flash {
            self.flash = if flash.ticks <= 1 {
                None
            } else {
                Some(Flash {
                    ticks: flash.ticks - 1,
                    ..flash
                })
            };
        }

        if let Some((token, ticks)) = self.pending {
            if ticks <= 1 {
                self.pending = None;
                self.session.finish_advance(token);
            } else {
                self.pending = Some((token, ticks - 1));
            }
        }

        self.tick_in_second += 1;
        if self.tick_in_second >= TICKS_PER_SECOND {
            self.tick_in_second = 0;
            self.session.tick();
            if self.session.is_ended() {
                self.state = AppState::Results;
                self.flash = None;
                self.pending = None;
            }
        }
    }

    pub fn activate(&mut self, idx: usize) {
        match self.session.activate_cell(idx) {
            Activation::Correct(token) => {
                self.flash = Some(Flash {
                    kind: FlashKind::Correct,
                    ticks: TRANSIENT_TICKS,
                });
                self.pending = Some((token, TRANSIENT_TICKS));
            }
            Activation::Incorrect => {
                self.flash = Some(Flash {
                    kind: FlashKind::Incorrect,
                    ticks: TRANSIENT_TICKS,
                });
            }
            _ => {}
        }
    }

    pub fn move_focus(&mut self, d_row: i32, d_col: i32) {
        let size = self.session.config().grid_size as usize;
        let (row, col) = row_col(self.focus, size);
        let row = (row as i32 + d_row).clamp(0, size as i32 - 1) as usize;
        let col = (col as i32 + d_col).clamp(0, size as i32 - 1) as usize;
        self.focus = cell_index(row, col, size);
    }

    pub fn settings_move(&mut self, delta: i32) {
        let rows = SETTINGS_ROWS as i32;
        self.settings_cursor = (self.settings_cursor as i32 + delta).rem_euclid(rows) as usize;
    }

    pub fn settings_adjust(&mut self, dir: i32) {
        let cfg = &mut self.config;
        match self.settings_cursor {
            r if r == SettingsRow::Control as usize => {
                cfg.control_mode = cycle(&CONTROL_MODE_OPTIONS, cfg.control_mode, dir)
            }
            r if r == SettingsRow::GridSize as usize => {
                cfg.grid_size = cycle(&GRID_SIZE_OPTIONS, cfg.grid_size, dir)
            }
            r if r == SettingsRow::Picks as usize => {
                cfg.picks_count = cycle(allowed_picks(cfg.grid_size), cfg.picks_count, dir)
            }
            r if r == SettingsRow::TargetMax as usize => {
                cfg.target_max = cycle(allowed_target_max(cfg.grid_size), cfg.target_max, dir)
            }
            r if r == SettingsRow::Seconds as usize => {
                cfg.seconds = cycle(&SECONDS_OPTIONS, cfg.seconds, dir)
            }
            r if r == SettingsRow::WrongMode as usize => {
                cfg.wrong_mode = cycle(&WRONG_MODE_OPTIONS, cfg.wrong_mode, dir)
            }
            _ => {}
        }
        self.config = self.config.clamped();
        let _ = save_config(&*self.store, &self.config);
        self.status = None;
    }

    pub fn save_preset(&mut self) {
        let name = format!("preset {}", self.presets.list().len() + 1);
        self.status = Some(match self.presets.add(&name, &self.config) {
            Ok(saved) => format!("saved \"{}\"", saved.name),
            Err(AddError::Duplicate) => "this mode is already saved".to_string(),
            Err(AddError::LimitReached) => "preset slots are full (max 4)".to_string(),
        });
    }

    pub fn apply_preset(&mut self, slot: usize) {
        let list = self.presets.list();
        if let Some(preset) = list.get(slot) {
            self.config = preset.config.clamped();
            let _ = save_config(&*self.store, &self.config);
            self.status = Some(format!("applied \"{}\"", preset.name));
        }
    }

    pub fn delete_preset(&mut self, slot: usize) {
        let list = self.presets.list();
        if let Some(preset) = list.get(slot) {
            self.presets.delete(&preset.id);
            self.status = Some(format!("deleted \"{}\"", preset.name));
        }
    }

    pub fn reset_data(&mut self) {
        let _ = reset_all_data(&*self.store);
        self.config = GameConfig::default();
        self.status = Some("settings, scores and presets wiped".to_string());
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        if self.state != AppState::Playing
            || self.session.config().control_mode != ControlMode::Pointer
        {
            return false;
        }
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let pos = Position {
                x: mouse.column,
                y: mouse.row,
            };
            if let Some(idx) = self.grid_rects.iter().position(|r| r.contains(pos)) {
                self.activate(idx);
                return true;
            }
        }
        false
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = &cli.export_history {
        let db = SessionDb::new()?;
        let file = std::fs::File::create(path)?;
        db.export_csv(file)?;
        println!("exported session history to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = match &cli.store {
        Some(path) => FileKvStore::with_path(path),
        None => FileKvStore::new(),
    };
    let config = cli.apply_to(load_config(&store));
    let mut app = App::new(config, store, cli.seed);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let events = get_game_events();
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match events.recv()? {
            GameEvent::Tick => {
                app.on_tick();
                // Only the play screen changes on its own over time
                if app.state != AppState::Settings {
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Mouse(mouse) => {
                if app.handle_mouse(mouse) {
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            GameEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.state {
        AppState::Settings => {
            if app.pending_delete {
                app.pending_delete = false;
                app.status = None;
                if let KeyCode::Char(c @ '1'..='4') = key.code {
                    app.delete_preset(c as usize - '1' as usize);
                }
                return false;
            }
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return true,
                KeyCode::Up => app.settings_move(-1),
                KeyCode::Down => app.settings_move(1),
                KeyCode::Left => app.settings_adjust(-1),
                KeyCode::Right => app.settings_adjust(1),
                KeyCode::Enter => app.start_session(),
                KeyCode::Char('s') => app.save_preset(),
                KeyCode::Char('d') => {
                    app.pending_delete = true;
                    app.status = Some("delete which preset? (1-4)".to_string());
                }
                KeyCode::Char('x') => app.reset_data(),
                KeyCode::Char(c @ '1'..='4') => app.apply_preset(c as usize - '1' as usize),
                _ => {}
            }
        }
        AppState::Playing => match key.code {
            KeyCode::Esc => app.stop_to_settings(),
            KeyCode::Up => app.move_focus(-1, 0),
            KeyCode::Down => app.move_focus(1, 0),
            KeyCode::Left => app.move_focus(0, -1),
            KeyCode::Right => app.move_focus(0, 1),
            KeyCode::Char(' ') | KeyCode::Enter => app.activate(app.focus),
            _ => {}
        },
        AppState::Results => match key.code {
            KeyCode::Char('r') | KeyCode::Enter => app.start_session(),
            KeyCode::Char('s') | KeyCode::Esc => app.stop_to_settings(),
            KeyCode::Char('q') => return true,
            _ => {}
        },
    }
    false
}

fn get_game_events() -> mpsc::Receiver<GameEvent> {
    let (tx, rx) = mpsc::channel();

    let tick_tx = tx.clone();
    thread::spawn(move || loop {
        if tick_tx.send(GameEvent::Tick).is_err() {
            break;
        }
        thread::sleep(Duration::from_millis(TICK_RATE_MS))
    });

    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(Event::Key(key)) => Some(GameEvent::Key(key)),
            Ok(Event::Mouse(mouse)) => Some(GameEvent::Mouse(mouse)),
            Ok(Event::Resize(_, _)) => Some(GameEvent::Resize),
            Ok(_) => None,
            Err(_) => break,
        };

        if let Some(evt) = evt {
            if tx.send(evt).is_err() {
                break;
            }
        }
    });

    rx
}
