//! Terminal UI: main entry point and event loop.

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

use std::cell::RefCell;
use std::io;
use std::time::Duration;

use crossterm::event::{poll as ct_poll, read as ct_read, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use self::app::App;
use crate::config::Config;
use crate::fetch::{FetchProgress, Orchestrator, RefundSource};
use crate::present::session::Session;
use crate::store::results::ResultStore;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the TUI application. Blocks until the user quits.
pub fn run_tui(config: &Config, store: ResultStore) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(config, store.clone())?;
    let source: Box<dyn RefundSource> = Box::new(orchestrator);
    let session =
        Session::new(store, source).with_sender_name_max(config.display.sender_name_max);
    let app = App::new(session, config);

    // Setup terminal (alternate screen)
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = RefCell::new(Terminal::new(backend)?);

    // Run the event loop
    let result = run_event_loop(&terminal, app);

    // Restore terminal (always, even on error)
    let mut terminal = terminal.into_inner();
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop: render → poll → handle → repeat.
///
/// Fetches run on this thread; their progress callback redraws the gauge.
fn run_event_loop(terminal: &RefCell<Term>, mut app: App) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(100);

    let on_progress = |p: FetchProgress| {
        if let Err(e) = terminal
            .borrow_mut()
            .draw(|frame| widgets::progress::render(frame, p))
        {
            tracing::debug!(error = %e, "Could not draw progress");
        }
    };

    app.open(Some(&on_progress));

    loop {
        terminal.borrow_mut().draw(|frame| {
            ui::render(frame, &mut app);
        })?;

        if ct_poll(tick_rate)? {
            if let Event::Key(key) = ct_read()? {
                if key.kind == KeyEventKind::Press {
                    event::handle_key_event(&mut app, key, Some(&on_progress))?;
                }
            }
        }

        // Periodic housekeeping
        app.tick();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
