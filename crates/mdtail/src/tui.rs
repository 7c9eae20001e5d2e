//! Terminal setup and teardown: raw mode, alternate screen, panic hook.

use std::io;
use std::io::stdout;
use std::io::Stdout;
use std::panic;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};

pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> io::Result<Terminal> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    set_panic_hook();
    ratatui::Terminal::new(CrosstermBackend::new(stdout()))
}

/// Restore terminal state. Also called from the panic hook so a crash never
/// leaves the terminal in raw mode.
pub fn restore() -> io::Result<()> {
    execute!(stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()
}

fn set_panic_hook() {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        hook(panic_info);
    }));
}
