//! Terminal session guard. Raw mode and the alternate screen are held for
//! the guard's lifetime and released on drop, error report or panic.

use std::io::{Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Switch the terminal into dashboard mode.
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        // From here on the guard owns the restore, even if setup fails.
        let mut tui = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
        };
        execute!(tui.terminal.backend_mut(), EnterAlternateScreen, cursor::Hide)?;
        tui.terminal.clear()?;
        Ok(tui)
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Best effort; every step runs even if an earlier one fails.
fn restore_terminal() {
    let _ = execute!(stdout(), cursor::Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Route color-eyre reports and panics through `restore_terminal` so
/// they print on a sane screen. Call before [`Tui::enter`].
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();

    let eyre_hook = eyre_hook.into_eyre_hook();
    color_eyre::eyre::set_hook(Box::new(move |error| {
        restore_terminal();
        eyre_hook(error)
    }))?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        panic_hook(info);
    }));
    Ok(())
}
