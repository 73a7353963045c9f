//! TUI entry point and terminal setup.

use std::io;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::fields::DeletePolicy;
use crate::planner::Planner;
use crate::store::JsonStore;
use crate::tui::app::GanttApp;

/// Initialise the terminal, run the Gantt view until the user quits, then restore
/// the terminal even if the loop failed.
pub fn run_tui(planner: Planner<JsonStore>, project_name: &str, policy: DeletePolicy) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = GanttApp::new(planner, project_name, policy);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
