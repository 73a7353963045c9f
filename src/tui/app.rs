//! Interactive Gantt view.
//!
//! `GanttApp` shows the task tree on the left and one timeline bar per row on the
//! right. Every edit goes through the `Planner`, so progress and date roll-ups are
//! already applied by the time the next frame is drawn.

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::dates::{format_day, truncate};
use crate::fields::{format_gantt_status, DeletePolicy};
use crate::hierarchy::CollapseSet;
use crate::planner::Planner;
use crate::store::JsonStore;
use crate::task::{Task, TaskId, TaskPatch};
use crate::timeline::TimelineWindow;
use crate::tui::{
    colors::{hex_color, status_color, DARK_RED, HEADER_BG, TRACK},
    enums::AppState,
    utils::centered_rect,
};

const ID_WIDTH: u16 = 4;
const NAME_WIDTH: u16 = 32;
const PROGRESS_WIDTH: u16 = 5;
const STATUS_WIDTH: u16 = 9;
const HIGHLIGHT: &str = ">> ";
/// Progress step for `+` and `-`.
const PROGRESS_STEP: u8 = 10;

pub struct GanttApp {
    state: AppState,
    planner: Planner<JsonStore>,
    project_name: String,
    delete_policy: DeletePolicy,
    collapsed: CollapseSet,
    table_state: TableState,
    /// Visible task ids in display order.
    rows: Vec<TaskId>,
    status_message: String,
    confirm_target: Option<TaskId>,
}

impl GanttApp {
    pub fn new(planner: Planner<JsonStore>, project_name: &str, delete_policy: DeletePolicy) -> Self {
        let mut app = GanttApp {
            state: AppState::Timeline,
            planner,
            project_name: project_name.to_string(),
            delete_policy,
            collapsed: CollapseSet::new(),
            table_state: TableState::default(),
            rows: Vec::new(),
            status_message: String::new(),
            confirm_target: None,
        };
        app.refresh_rows();
        app
    }

    /// Rebuild the visible rows, keeping the selection on the same task when it is
    /// still visible.
    fn refresh_rows(&mut self) {
        let old_selected = self.selected_id();
        self.rows = self
            .planner
            .hierarchy()
            .flatten_for_display(&self.collapsed)
            .iter()
            .map(|row| row.task.id)
            .collect();

        let index = old_selected
            .and_then(|id| self.rows.iter().position(|&r| r == id))
            .or_else(|| {
                let prev = self.table_state.selected().unwrap_or(0);
                (!self.rows.is_empty()).then(|| prev.min(self.rows.len() - 1))
            });
        self.table_state.select(index);
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.table_state.selected().and_then(|i| self.rows.get(i).copied())
    }

    fn selected_task(&self) -> Option<&Task> {
        self.selected_id().and_then(|id| self.planner.hierarchy().get(id))
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, self.rows.len() as isize - 1);
        self.table_state.select(Some(next as usize));
    }

    fn toggle_collapse(&mut self) {
        let Some(id) = self.selected_id() else { return };
        if !self.planner.hierarchy().has_children(id) {
            self.set_status_message("Task has no children".to_string());
            return;
        }
        let collapsed = self.collapsed.toggle(id);
        self.refresh_rows();
        self.set_status_message(if collapsed { "Collapsed".to_string() } else { "Expanded".to_string() });
    }

    fn apply_patch(&mut self, id: TaskId, patch: TaskPatch, done: String) {
        match self.planner.update_task(id, patch) {
            Ok(()) => self.set_status_message(done),
            Err(e) => self.set_status_message(format!("Error: {}", e)),
        }
        self.refresh_rows();
    }

    fn adjust_progress(&mut self, up: bool) {
        let Some((id, current)) = self.selected_task().map(|t| (t.id, t.progress)) else { return };
        if self.planner.hierarchy().has_children(id) {
            self.set_status_message("Progress of a parent follows its children".to_string());
            return;
        }
        let progress = if up {
            current.saturating_add(PROGRESS_STEP).min(100)
        } else {
            current.saturating_sub(PROGRESS_STEP)
        };
        if progress == current {
            return;
        }
        let patch = TaskPatch { progress: Some(progress), ..TaskPatch::default() };
        self.apply_patch(id, patch, format!("Progress {}%", progress));
    }

    fn cycle_status(&mut self) {
        let Some((id, status)) = self.selected_task().map(|t| (t.id, t.status.cycle())) else { return };
        let patch = TaskPatch { status: Some(status), ..TaskPatch::default() };
        self.apply_patch(id, patch, format!("Status: {}", format_gantt_status(status)));
    }

    fn reload(&mut self) {
        match self.planner.refresh() {
            Ok(()) => self.set_status_message("Reloaded".to_string()),
            Err(e) => self.set_status_message(format!("Reload failed: {}", e)),
        }
        self.refresh_rows();
    }

    fn delete_confirmed(&mut self) {
        let Some(id) = self.confirm_target.take() else { return };
        match self.planner.delete_task(id, self.delete_policy) {
            Ok(n) => self.set_status_message(format!("Deleted {} task(s)", n)),
            Err(e) => self.set_status_message(format!("Error deleting task: {}", e)),
        }
        self.refresh_rows();
    }

    fn handle_timeline_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::Home => self.move_selection(isize::MIN / 2),
            KeyCode::End => self.move_selection(isize::MAX / 2),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_collapse(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_progress(true),
            KeyCode::Char('-') => self.adjust_progress(false),
            KeyCode::Char('s') => self.cycle_status(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.confirm_target = Some(id);
                    self.state = AppState::ConfirmDelete;
                }
            }
            _ => {}
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.delete_confirmed();
                self.state = AppState::Timeline;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_target = None;
                self.state = AppState::Timeline;
            }
            _ => {}
        }
    }

    /// Apply one key press. Returns true if the application should quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match self.state {
            AppState::Timeline => self.handle_timeline_key(key, modifiers),
            AppState::ConfirmDelete => {
                self.handle_confirm_key(key);
                false
            }
            AppState::Help => {
                self.state = AppState::Timeline;
                false
            }
        }
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn render_timeline(&mut self, f: &mut Frame, area: Rect) {
        let hierarchy = self.planner.hierarchy();
        let window = TimelineWindow::for_tasks(hierarchy.tasks(), Utc::now());

        // Borders, highlight symbol and the four column gaps.
        let fixed = ID_WIDTH + NAME_WIDTH + PROGRESS_WIDTH + STATUS_WIDTH + HIGHLIGHT.len() as u16 + 4 + 2;
        let bar_width = area.width.saturating_sub(fixed);

        let header = Row::new(vec![
            Cell::from("ID"),
            Cell::from("Task"),
            Cell::from("Prog"),
            Cell::from("Status"),
            Cell::from(timeline_header(&window, bar_width)),
        ])
        .style(Style::default().bg(HEADER_BG).fg(Color::White).add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter_map(|&id| hierarchy.get(id))
            .map(|task| {
                let level = hierarchy.depth_of(task);
                let marker = if !hierarchy.has_children(task.id) {
                    "  "
                } else if self.collapsed.is_collapsed(task.id) {
                    "▸ "
                } else {
                    "▾ "
                };
                let color = hex_color(&hierarchy.display_color(task));
                let name = format!("{}{}{}", "  ".repeat(level), marker, task.name);
                Row::new(vec![
                    Cell::from(task.id.to_string()),
                    Cell::from(truncate(&name, NAME_WIDTH as usize)).style(Style::default().fg(color)),
                    Cell::from(format!("{:>3}%", task.progress)),
                    Cell::from(format_gantt_status(task.status)).style(Style::default().fg(status_color(task.status))),
                    Cell::from(bar_line(&window, task, bar_width, color)),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(ID_WIDTH),
            Constraint::Length(NAME_WIDTH),
            Constraint::Length(PROGRESS_WIDTH),
            Constraint::Length(STATUS_WIDTH),
            Constraint::Min(0),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "{} ({} tasks) - Press '?' for help",
                self.project_name,
                hierarchy.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(HIGHLIGHT);

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(vec![Span::styled("Timeline Help", bold)]),
            Line::from(""),
            Line::from("  ↑/k, ↓/j     Move selection"),
            Line::from("  PgUp/PgDn    Move ten rows"),
            Line::from("  Space/Enter  Collapse or expand the selected task"),
            Line::from("  +/-          Raise or lower progress by 10% (tasks without children)"),
            Line::from("  s            Cycle status (On track → At risk → Delayed)"),
            Line::from("  d            Delete selected task"),
            Line::from("  r            Reload from disk"),
            Line::from("  ?/h/F1       Show this help"),
            Line::from("  q/Esc        Quit"),
            Line::from(""),
            Line::from(vec![Span::styled("Roll-up:", bold)]),
            Line::from("  A parent's progress is the mean of its children and its dates span theirs."),
            Line::from(format!("  Deleting a parent uses the '{:?}' policy.", self.delete_policy)),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let target = self
            .confirm_target
            .and_then(|id| self.planner.hierarchy().get(id))
            .map(|t| {
                let children = self.planner.hierarchy().descendants_of(t.id).len();
                match (self.delete_policy, children) {
                    (_, 0) => format!("Delete '{}'", t.name),
                    (DeletePolicy::Cascade, n) => format!("Delete '{}' and {} descendant(s)", t.name, n),
                    (DeletePolicy::Reparent, _) => format!("Delete '{}' and move its children up", t.name),
                }
            })
            .unwrap_or_default();

        let block = Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));
        let area = centered_rect(50, 25, area);
        f.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(target, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if let Some(t) = self.selected_task() {
            format!(
                "#{} {} | {} → {} | {}% | Press '?' for help",
                t.id,
                t.name,
                format_day(t.start),
                format_day(t.end),
                t.progress
            )
        } else {
            "No tasks. Add some with `pt add` | q to quit".to_string()
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(HEADER_BG).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::Timeline => self.render_timeline(f, chunks[0]),
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::ConfirmDelete => {
                self.render_timeline(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Draws and handles input until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Window start date on the left, end date on the right.
fn timeline_header(window: &TimelineWindow, width: u16) -> String {
    let start = format_day(window.start);
    let end = format_day(window.end);
    let width = width as usize;
    if width < start.len() + end.len() + 1 {
        return start.chars().take(width).collect();
    }
    format!("{}{}{}", start, " ".repeat(width - start.len() - end.len()), end)
}

/// A task's bar: solid for the completed share, shaded for the rest.
fn bar_line(window: &TimelineWindow, task: &Task, width: u16, color: Color) -> Line<'static> {
    if width == 0 {
        return Line::default();
    }
    let (first, len) = window.columns(task, width);
    let done = (len as u32 * task.progress.min(100) as u32 + 50) / 100;
    let rest = len as u32 - done;
    Line::from(vec![
        Span::raw(" ".repeat(first as usize)),
        Span::styled("█".repeat(done as usize), Style::default().fg(color)),
        Span::styled("░".repeat(rest as usize), Style::default().fg(TRACK)),
    ])
}
