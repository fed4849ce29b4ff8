use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::ntp::PollReport;
use crate::fmt::text::format_rtt;

/// Last known state of one configured target.
#[derive(Debug, Clone)]
pub struct TargetRow {
    pub conf: String,
    pub server: Option<String>,
    pub domain: Option<String>,
    pub reference: Option<String>,
    pub rtt: Option<Duration>,
    pub stratum: Option<u8>,
    pub version: Option<u8>,
    pub error: Option<String>,
}

impl TargetRow {
    pub fn new(conf: String) -> Self {
        Self {
            conf,
            server: None,
            domain: None,
            reference: None,
            rtt: None,
            stratum: None,
            version: None,
            error: None,
        }
    }

    pub fn update(&mut self, report: &PollReport) {
        match &report.outcome {
            Ok(res) => {
                self.server = Some(res.responder.to_string());
                self.domain = report.names.first().cloned();
                self.reference = Some(res.header.reference_id_string());
                self.rtt = Some(res.rtt);
                self.stratum = Some(res.header.stratum);
                self.version = Some(res.header.version);
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
    }
}

/// TUI application state
pub struct TuiApp {
    pub rows: Vec<TargetRow>,
    /// Row updated most recently.
    pub current: Option<usize>,
    pub local_addr: String,
    pub cycle: u32,
    pub successes: usize,
    pub failures: usize,
    pub should_quit: bool,
    pub paused: bool,
}

impl TuiApp {
    pub fn new(target_names: Vec<String>, local_addr: String) -> Self {
        Self {
            rows: target_names.into_iter().map(TargetRow::new).collect(),
            current: None,
            local_addr,
            cycle: 0,
            successes: 0,
            failures: 0,
            should_quit: false,
            paused: false,
        }
    }

    pub fn apply(&mut self, report: &PollReport) {
        let Some(row) = self.rows.get_mut(report.index) else {
            return;
        };
        row.update(report);
        if report.is_success() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.current = Some(report.index);
        self.cycle = report.pass + 1;
    }

    /// Take every pending report off `rx`. Reports are dropped while paused.
    pub fn drain(&mut self, rx: &mut UnboundedReceiver<PollReport>) {
        while let Ok(report) = rx.try_recv() {
            if !self.paused {
                self.apply(&report);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.paused = !self.paused;
            }
            _ => {}
        }
    }
}

pub fn ui(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Targets
            Constraint::Length(3), // Help
        ])
        .split(frame.area());

    render_title(frame, chunks[0], app);
    render_table(frame, chunks[1], app);
    render_help(frame, chunks[2], app);
}

fn render_title(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "ntpman ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(env!("CARGO_PKG_VERSION")),
        Span::raw("  "),
        Span::styled(app.local_addr.clone(), Style::default().fg(Color::White)),
        Span::raw(format!(
            "  cycle #{}  ok {} / failed {}",
            app.cycle, app.successes, app.failures
        )),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let header = Row::new(["", "Conf", "Server", "Domain", "Ref", "RTT", "S", "V"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.rows.iter().enumerate().map(|(i, row)| {
        let marker = if app.current == Some(i) { ">" } else { " " };
        let server = match &row.error {
            Some(e) => Cell::from(e.clone()).style(Style::default().fg(Color::Red)),
            None => Cell::from(row.server.clone().unwrap_or_default()),
        };
        Row::new(vec![
            Cell::from(marker),
            Cell::from(row.conf.clone()),
            server,
            Cell::from(row.domain.clone().unwrap_or_default()),
            Cell::from(row.reference.clone().unwrap_or_default()),
            Cell::from(row.rtt.map(format_rtt).unwrap_or_default())
                .style(Style::default().fg(Color::Yellow)),
            Cell::from(row.stratum.map(|s| s.to_string()).unwrap_or_default()),
            Cell::from(row.version.map(|v| v.to_string()).unwrap_or_default()),
        ])
    });

    let widths = [
        Constraint::Length(1),
        Constraint::Percentage(20),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
        Constraint::Length(16),
        Constraint::Length(12),
        Constraint::Length(3),
        Constraint::Length(2),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Targets"));
    frame.render_widget(table, area);
}

fn render_help(frame: &mut Frame, area: Rect, app: &TuiApp) {
    let text = if app.paused {
        "PAUSED | q: Quit | p: Pause/Resume"
    } else {
        "q: Quit | p: Pause/Resume"
    };
    let help = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, area);
}

/// Run the TUI application
pub fn run_tui<F>(app: &mut TuiApp, mut update_fn: F) -> io::Result<()>
where
    F: FnMut(&mut TuiApp) -> io::Result<bool>, // Returns true if should continue
{
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, app, &mut update_fn);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_app<F>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    update_fn: &mut F,
) -> io::Result<()>
where
    F: FnMut(&mut TuiApp) -> io::Result<bool>,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit {
            break;
        }

        if !update_fn(app)? {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NtpmanError;
    use ratatui::{backend::TestBackend, buffer::Buffer};

    fn timeout_report(index: usize) -> PollReport {
        PollReport {
            pass: 0,
            index,
            target: "b".into(),
            responder: None,
            names: Vec::new(),
            outcome: Err(NtpmanError::QueryTimeout(Duration::from_secs(1))),
        }
    }

    #[test]
    fn apply_marks_current_row() {
        let mut app = TuiApp::new(vec!["a".into(), "b".into()], "0.0.0.0:4000".into());
        app.apply(&timeout_report(1));
        assert_eq!(app.current, Some(1));
        assert_eq!(app.failures, 1);
        assert_eq!(app.cycle, 1);
        assert!(app.rows[1].error.is_some());
        app.apply(&timeout_report(7));
        assert_eq!(app.failures, 1);
    }

    #[test]
    fn paused_drain_discards_reports() {
        let mut app = TuiApp::new(vec!["a".into(), "b".into()], String::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(timeout_report(1)).unwrap();
        app.handle_key(KeyCode::Char('p'));
        app.drain(&mut rx);
        assert!(rx.try_recv().is_err());
        assert_eq!(app.failures, 0);
        assert!(app.rows[1].error.is_none());

        app.handle_key(KeyCode::Char('p'));
        tx.send(timeout_report(0)).unwrap();
        app.drain(&mut rx);
        assert_eq!(app.failures, 1);
    }

    #[test]
    fn keys_toggle_state() {
        let mut app = TuiApp::new(vec![], String::new());
        app.handle_key(KeyCode::Char('p'));
        assert!(app.paused);
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn renders_headers() {
        let app = TuiApp::new(vec!["pool.example".into()], "0.0.0.0:4000".into());
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();
        let buffer: &Buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        for needle in ["ntpman", "Conf", "Server", "Domain", "RTT", "pool.example"] {
            assert!(text.contains(needle), "{needle} not rendered");
        }
    }
}
