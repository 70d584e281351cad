use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use sumgrid::config::{
    allowed_picks, allowed_target_max, ControlMode, CONTROL_MODE_OPTIONS, GRID_SIZE_OPTIONS,
    SECONDS_OPTIONS, WRONG_MODE_OPTIONS,
};
use sumgrid::util::format_mmss;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::{App, AppState, FlashKind, SettingsRow, SETTINGS_ROWS};

const SIDEBAR_WIDTH: u16 = 24;
const CELL_WIDTH: u16 = 7;
const CELL_HEIGHT: u16 = 3;
const CELL_GAP: u16 = 1;

/// Render the whole frame and refresh the grid hit-boxes used for mouse
/// input, so clicks always land on what was last drawn.
pub fn draw(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::Settings => draw_settings(app, f),
        AppState::Playing => draw_playing(app, f),
        AppState::Results => draw_results(app, f),
    }
}

/// Row-major cell rectangles for a `size`-by-`size` board centered in
/// `area`. Shared by rendering and mouse hit-testing.
pub fn grid_cell_rects(area: Rect, size: u8) -> Vec<Rect> {
    let n = size as u16;
    let total_w = n * CELL_WIDTH + (n - 1) * CELL_GAP;
    let total_h = n * CELL_HEIGHT + (n - 1) * CELL_GAP;
    let x0 = area.x + area.width.saturating_sub(total_w) / 2;
    let y0 = area.y + area.height.saturating_sub(total_h) / 2;

    let mut rects = Vec::with_capacity((n * n) as usize);
    for row in 0..n {
        for col in 0..n {
            rects.push(Rect {
                x: x0 + col * (CELL_WIDTH + CELL_GAP),
                y: y0 + row * (CELL_HEIGHT + CELL_GAP),
                width: CELL_WIDTH,
                height: CELL_HEIGHT,
            });
        }
    }
    rects
}

fn draw_playing(app: &mut App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .horizontal_margin(2)
        .vertical_margin(1)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(f.area());

    draw_sidebar(app, f, chunks[0]);

    let rects = grid_cell_rects(chunks[1], app.session.config().grid_size);
    let selected_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let normal_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let keyboard = app.session.config().control_mode == ControlMode::Keyboard;
    for (idx, rect) in rects.iter().enumerate() {
        let selected = app.session.selected_idxs().contains(&idx);
        let focused = keyboard && idx == app.focus;
        let style = if selected { selected_style } else { normal_style };
        let border_style = if focused {
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Blue)
        };
        let cell = Paragraph::new(Span::styled(
            app.session.round().numbers[idx].to_string(),
            style,
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
        f.render_widget(cell, *rect);
    }
    app.grid_rects = rects;
}

fn draw_sidebar(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // target
            Constraint::Length(3), // time
            Constraint::Length(3), // score / best
            Constraint::Length(2), // flash
            Constraint::Min(0),
        ])
        .split(area);

    let target = Paragraph::new(Span::styled(
        app.session.round().target.to_string(),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("target"));
    f.render_widget(target, chunks[0]);

    let time = Paragraph::new(Span::styled(
        format_mmss(app.session.time_left()),
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("time left"));
    f.render_widget(time, chunks[1]);

    let score = Paragraph::new(Span::styled(
        format!("{}  (best {})", app.session.score(), app.session.best()),
        Style::default()
            .fg(Color::LightYellow)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("score"));
    f.render_widget(score, chunks[2]);

    if let Some(flash) = &app.flash {
        let (text, style) = match flash.kind {
            FlashKind::Correct => (
                "correct!",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            FlashKind::Incorrect => (
                "try again",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        };
        let flash_widget = Paragraph::new(Span::styled(text, style)).alignment(Alignment::Center);
        f.render_widget(flash_widget, chunks[3]);
    }

    let help = Paragraph::new(match app.session.config().control_mode {
        ControlMode::Keyboard => "arrows move, space picks\nesc back to settings",
        ControlMode::Pointer => "click cells to pick\nesc back to settings",
    })
    .style(Style::default().add_modifier(Modifier::DIM))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(help, chunks[4]);
}

fn option_row<T: PartialEq + ToString>(
    label: &str,
    options: &[T],
    current: &T,
    active: bool,
) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{label:<14}"),
        if active {
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        },
    )];
    for opt in options {
        let text = format!(" {} ", opt.to_string());
        if opt == current {
            spans.push(Span::styled(
                text,
                Style::default()
                    .fg(Color::Black)
                    .bg(if active { Color::Magenta } else { Color::Gray }),
            ));
        } else {
            spans.push(Span::styled(
                text,
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn draw_settings(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(4)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(2),                    // title
            Constraint::Length(SETTINGS_ROWS as u16 + 3), // option rows
            Constraint::Length(7),                    // presets
            Constraint::Length(2),                    // status
            Constraint::Min(2),                       // help
        ])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "sumgrid",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let cfg = &app.config;
    let cursor = app.settings_cursor;
    let rows = vec![
        option_row(
            "control",
            &CONTROL_MODE_OPTIONS,
            &cfg.control_mode,
            cursor == SettingsRow::Control as usize,
        ),
        option_row(
            "grid size",
            &GRID_SIZE_OPTIONS,
            &cfg.grid_size,
            cursor == SettingsRow::GridSize as usize,
        ),
        option_row(
            "picks",
            allowed_picks(cfg.grid_size),
            &cfg.picks_count,
            cursor == SettingsRow::Picks as usize,
        ),
        option_row(
            "target max",
            allowed_target_max(cfg.grid_size),
            &cfg.target_max,
            cursor == SettingsRow::TargetMax as usize,
        ),
        option_row(
            "seconds",
            &SECONDS_OPTIONS,
            &cfg.seconds,
            cursor == SettingsRow::Seconds as usize,
        ),
        option_row(
            "wrong guess",
            &WRONG_MODE_OPTIONS,
            &cfg.wrong_mode,
            cursor == SettingsRow::WrongMode as usize,
        ),
    ];
    let mut lines = rows;
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("high score for this mode: {}", app.scores.best_for(cfg)),
        Style::default().fg(Color::LightYellow),
    )));
    f.render_widget(Paragraph::new(lines), chunks[1]);

    let mut preset_lines = vec![Line::from(Span::styled(
        "saved presets",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let presets = app.presets.list();
    if presets.is_empty() {
        preset_lines.push(Line::from(Span::styled(
            "  (none)",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    for (i, preset) in presets.iter().enumerate() {
        let c = &preset.config;
        preset_lines.push(Line::from(format!(
            "  [{}] {}  {}x{} picks {} target {} {}s {}",
            i + 1,
            preset.name,
            c.grid_size,
            c.grid_size,
            c.picks_count,
            c.target_max,
            c.seconds,
            c.wrong_mode,
        )));
    }
    f.render_widget(Paragraph::new(preset_lines), chunks[2]);

    if let Some(status) = &app.status {
        let status_widget = Paragraph::new(Span::styled(
            status.clone(),
            Style::default().fg(Color::LightGreen),
        ));
        f.render_widget(status_widget, chunks[3]);
    }

    let help = Paragraph::new(
        "up/down row, left/right change, enter start\n\
         s save preset, 1-4 apply, d then 1-4 delete, x wipe data, esc quit",
    )
    .style(Style::default().add_modifier(Modifier::DIM))
    .wrap(Wrap { trim: true });
    f.render_widget(help, chunks[4]);
}

fn draw_results(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let width = area.width.min(44);
    let height = area.height.min(14);
    let boxed = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, boxed);

    let score = app.session.score();
    let best = app.session.best();
    let mut lines = vec![
        Line::from(Span::styled(
            "time's up!",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("correct answers: {score}")),
        Line::from(if score > 0 && score >= best {
            Span::styled(
                format!("new best: {best}"),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(format!("best for this mode: {best}"))
        }),
        Line::from(""),
    ];

    if let Some(db) = app.session.history() {
        if let Ok(recent) = db.recent(3) {
            if !recent.is_empty() {
                lines.push(Line::from(Span::styled(
                    "recent sessions",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for rec in recent {
                    let elapsed = (chrono::Local::now() - rec.played_at)
                        .to_std()
                        .unwrap_or_default();
                    let ago = HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past);
                    lines.push(Line::from(Span::styled(
                        format!("  {} pts  {}", rec.score, ago),
                        Style::default().add_modifier(Modifier::DIM),
                    )));
                }
                lines.push(Line::from(""));
            }
        }
    }

    lines.push(Line::from(Span::styled(
        "(r)etry  (s)ettings  (q)uit",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, boxed);
}
