//! App state and main loop: input handling, driving the session, and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fleettop::session::Session;
use fleettop::source::MetricsSource;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Rect},
    Terminal,
};
use tokio::time::sleep;

use crate::ui::cards::{cards_clamp, cards_handle_key, draw_cards, total_rows};
use crate::ui::{controls::draw_controls, header::draw_header};

pub struct App<S> {
    session: Session<S>,

    // Quit flag
    should_quit: bool,

    // Start monitoring once the initial load settles
    autostart: bool,

    // Interval field has keyboard focus
    editing_interval: bool,

    pub cards_scroll: usize,
    last_cards_area: Option<Rect>,
}

impl<S: MetricsSource> App<S> {
    pub fn new(session: Session<S>, autostart: bool) -> Self {
        Self {
            session,
            should_quit: false,
            autostart,
            editing_interval: false,
            cards_scroll: 0,
            last_cards_area: None,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Initial load: config (populates environments) then metrics
        self.session.load_config_and_metrics();

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind == KeyEventKind::Press {
                        self.handle_key(k);
                    }
                }
            }
            if self.should_quit {
                break;
            }

            // Apply finished requests, fire due ticks
            let now = Instant::now();
            self.session.pump(now);
            if self.autostart && !self.session.is_busy() {
                self.autostart = false;
                self.session.start_monitoring(now);
            }

            // Draw
            terminal.draw(|f| self.draw(f))?;

            // Tick rate
            sleep(Duration::from_millis(100)).await;
        }

        Ok(())
    }

    fn handle_key(&mut self, k: KeyEvent) {
        if self.editing_interval {
            let field = self.session.interval_input_mut();
            match k.code {
                KeyCode::Char(c) if c.is_ascii_digit() && field.len() < 6 => field.push(c),
                KeyCode::Backspace => {
                    field.pop();
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.editing_interval = false,
                _ => {}
            }
            return;
        }

        // Raw mode swallows SIGINT
        if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => {
                self.session.refresh();
            }
            KeyCode::Char('m') => self.session.toggle_monitoring(Instant::now()),
            KeyCode::Char('i') => self.editing_interval = true,
            KeyCode::Char('e') => self.session.cycle_environment(1),
            KeyCode::Char('E') => self.session.cycle_environment(-1),
            _ => {
                if let Some(area) = self.last_cards_area {
                    let page = (area.height / 4).max(1) as usize;
                    cards_handle_key(&mut self.cards_scroll, k, page);
                    let total = total_rows(self.session.dashboard(), area.width);
                    cards_clamp(&mut self.cards_scroll, total);
                }
            }
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, controls, cards
        let rows = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // header + rule
                Constraint::Length(1), // controls / status
                Constraint::Min(3),    // cards
            ])
            .split(area);

        draw_header(
            f,
            rows[0],
            self.session.environment(),
            self.session.monitor(),
            self.session.dashboard(),
        );
        draw_controls(
            f,
            rows[1],
            self.session.interval_input(),
            self.editing_interval,
            self.session.monitor(),
            &self.session.dashboard().status,
        );

        // Cache for input handlers
        self.last_cards_area = Some(rows[2]);
        let total = total_rows(self.session.dashboard(), rows[2].width);
        cards_clamp(&mut self.cards_scroll, total);
        draw_cards(f, rows[2], self.session.dashboard(), self.cards_scroll);
    }
}
