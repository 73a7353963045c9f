//! Enumerations for TUI state management.

/// Which screen the Gantt view is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    Timeline,
    Help,
    ConfirmDelete,
}
