//! Dashboard TUI - terminal view of the inflation dashboard
//!
//! Mounts a dashboard against the configured endpoint and renders:
//! - Category menu (left)
//! - One card per metric in the selected category: value, change, history
//! - Status line (loading, error message, last refresh)
//!
//! Keys: Up/Down move, Enter selects, q/Esc quits.
//! Logs go to the file named in `[log] file`.

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use inflation_dashboard::domain::{DashboardState, DisplayMetric, Trend};
use inflation_dashboard::infra::{Config, Metrics};
use inflation_dashboard::io::{FetchClient, MetricsSource};
use inflation_dashboard::services::{CategorySelector, Dashboard};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Sparkline, Wrap},
    Frame, Terminal,
};
use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

const CARD_COLUMNS: usize = 3;
const SPARKLINE_SCALE: f64 = 100.0;

#[derive(Parser, Debug)]
#[command(name = "dashboard-tui", version, about = "Terminal inflation dashboard")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

/// Menu cursor; separate from the selected category until Enter is pressed
#[derive(Default)]
struct MenuState {
    cursor: usize,
}

impl MenuState {
    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // Logging needs the config for its file sink; report a fallback once it is up
    let (config, config_error) = match Config::from_file(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_file = File::create(config.log_file())?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "config_fallback_to_defaults");
    }
    info!(
        config_file = %config.config_file(),
        endpoint = %config.endpoint_url(),
        "dashboard_tui_starting"
    );

    let metrics = Arc::new(Metrics::new());
    let source: Arc<dyn MetricsSource> = Arc::new(FetchClient::new(&config, metrics.clone())?);
    let mut dashboard = Dashboard::mount(source, metrics.clone());
    let snapshots = dashboard.subscribe();
    let selector = dashboard.category_selector();
    dashboard.start();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, snapshots, selector, config.endpoint_url()).await;

    dashboard.unmount();
    metrics.report().log();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    snapshots: watch::Receiver<DashboardState>,
    selector: CategorySelector,
    endpoint: &str,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut menu = MenuState::default();

    loop {
        let state = snapshots.borrow().clone();
        let labels: Vec<String> = state.categories.labels().map(str::to_string).collect();
        terminal.draw(|f| draw_ui(f, &state, &labels, &menu, endpoint))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        // crossterm polling blocks; keep it off the async workers
        let key = tokio::task::block_in_place(|| -> io::Result<Option<KeyCode>> {
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(Some(key.code));
                    }
                }
            }
            Ok(None)
        })?;

        match key {
            Some(KeyCode::Char('q')) | Some(KeyCode::Esc) => return Ok(()),
            Some(KeyCode::Up) => menu.move_by(-1, labels.len()),
            Some(KeyCode::Down) => menu.move_by(1, labels.len()),
            Some(KeyCode::Enter) => {
                if let Some(label) = labels.get(menu.cursor) {
                    selector.select(label);
                }
            }
            _ => {}
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

fn draw_ui(
    f: &mut Frame,
    state: &DashboardState,
    labels: &[String],
    menu: &MenuState,
    endpoint: &str,
) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], state, endpoint);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(main_chunks[1]);

    draw_menu(f, body[0], state, labels, menu);

    if state.loading {
        let waiting = Paragraph::new("Loading metrics...")
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(waiting, body[1]);
    } else if state.categories.is_empty() {
        let message = state.error_message().unwrap_or("No data");
        let error = Paragraph::new(Span::styled(message, Style::default().fg(Color::Red)))
            .block(Block::default().title(" Error ").borders(Borders::ALL));
        f.render_widget(error, body[1]);
    } else {
        draw_cards(f, body[1], state);
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState, endpoint: &str) {
    let (status_text, status_color) = match (state.loading, state.error_message()) {
        (true, _) => ("LOADING".to_string(), Color::Yellow),
        (false, Some(message)) => (message.to_string(), Color::Red),
        (false, None) => ("OK".to_string(), Color::Green),
    };

    let refreshed = state
        .last_refreshed
        .map(|t| t.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Inflation Dashboard ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | Refreshed: "),
        Span::raw(refreshed),
        Span::raw(" | Data as of: "),
        Span::raw(state.data_as_of.clone().unwrap_or_else(|| "-".to_string())),
        Span::styled(format!(" | {}", endpoint), Style::default().fg(Color::DarkGray)),
        Span::raw(" | 'q' quits"),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_menu(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    labels: &[String],
    menu: &MenuState,
) {
    let items: Vec<ListItem> = labels
        .iter()
        .map(|label| {
            let selected = state.selected_category.as_deref() == Some(label.as_str());
            let style = if selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(label.clone(), style))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title(" Dashboard ").borders(Borders::ALL))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if !labels.is_empty() {
        list_state.select(Some(menu.cursor.min(labels.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_cards(f: &mut Frame, area: Rect, state: &DashboardState) {
    let metrics = state.selected_metrics();
    let title = match state.selected_category.as_deref() {
        Some(label) => format!(" {} ({}) ", label, metrics.len()),
        None => " Select a category ".to_string(),
    };
    let outer = Block::default().title(title).borders(Borders::ALL);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    if metrics.is_empty() {
        return;
    }

    let rows = metrics.len().div_ceil(CARD_COLUMNS);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(inner);

    for (row, chunk) in metrics.chunks(CARD_COLUMNS).enumerate() {
        let col_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, CARD_COLUMNS as u32); CARD_COLUMNS])
            .split(row_areas[row]);
        for (col, metric) in chunk.iter().enumerate() {
            draw_card(f, col_areas[col], metric);
        }
    }
}

fn draw_card(f: &mut Frame, area: Rect, metric: &DisplayMetric) {
    let block = Block::default()
        .title(format!(" {} ", metric.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Value + change
            Constraint::Min(2),    // History
            Constraint::Length(1), // Last updated
        ])
        .split(inner);

    let change_color = match metric.trend() {
        Trend::Rising => Color::Red,
        Trend::Falling => Color::Green,
        Trend::Unknown => Color::White,
    };

    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(metric.formatted_value(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::styled(
                metric.units.clone().unwrap_or_default(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::raw("Change: "),
            Span::styled(metric.formatted_change(), Style::default().fg(change_color)),
        ]),
        Line::from(Span::styled(metric.description, Style::default().fg(Color::DarkGray))),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(summary, parts[0]);

    let data = sparkline_data(&metric.history_values());
    if !data.is_empty() {
        let sparkline = Sparkline::default().data(&data).style(Style::default().fg(Color::Magenta));
        f.render_widget(sparkline, parts[1]);
    }

    let updated = Paragraph::new(Span::styled(
        format!("Last Updated: {}", metric.last_updated_or_unknown()),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(updated, parts[2]);
}

/// Rescale values to 0..=100 so small movements stay visible
fn sparkline_data(values: &[f64]) -> Vec<u64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    values
        .iter()
        .map(|&v| {
            if span > 0.0 {
                (((v - min) / span) * SPARKLINE_SCALE).round() as u64
            } else {
                (SPARKLINE_SCALE / 2.0) as u64
            }
        })
        .collect()
}
