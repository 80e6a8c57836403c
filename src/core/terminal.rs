//! Terminal rendering and event loop for burrow.
//!
//! Handles setup/teardown of raw mode and the alternate screen, drives the session once
//! per tick, redraws, and forwards key and resize events.

use crate::app::{KeypressResult, Session};
use crate::config::Theme;
use crate::ui;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use std::{io, time::Duration};

/// Initializes the terminal in raw mode and alternate screen and runs the event loop.
///
/// Blocks until the session reaches an outcome or the user quits.
///
/// Returns an std::io::Error if terminal setup or teardown fails.
pub(crate) fn run_terminal(session: &mut Session, theme: &Theme, tick: Duration) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, session, theme, tick);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    result
}

/// Drives the session without a terminal until it reaches an outcome.
pub(crate) fn run_headless(session: &mut Session) {
    while !session.outcome().is_final() {
        if !session.tick() {
            break;
        }
    }
}

/// Main loop: one drive per tick, redraw on change, then poll input for the rest of the tick.
fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    theme: &Theme,
    tick: Duration,
) -> io::Result<()>
where
    io::Error: From<<B as Backend>::Error>,
{
    loop {
        if session.tick() {
            terminal.draw(|f| ui::render(f, session, theme))?;
        }
        if session.outcome().is_final() {
            break;
        }

        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let KeypressResult::Quit = session.handle_keypress(key) {
                        break;
                    }
                    terminal.draw(|f| ui::render(f, session, theme))?;
                }

                Event::Resize(_, _) => {
                    terminal.draw(|f| ui::render(f, session, theme))?;
                }

                _ => {}
            }
        }
    }
    Ok(())
}
