//! Timeline window and bar placement for Gantt rendering.

use chrono::{DateTime, Duration, Utc};

use crate::dates::ceil_days;
use crate::task::Task;

/// Days of padding on each side of the task span.
const PADDING_DAYS: i64 = 7;

/// Visible date range of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_days: i64,
}

/// A task bar in whole days relative to the window start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSpan {
    pub offset_days: i64,
    pub duration_days: i64,
}

impl TimelineWindow {
    /// Window covering every task with a week of padding either side; centred on
    /// `now` when there are no tasks.
    pub fn for_tasks<'a, I>(tasks: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let span = tasks.into_iter().fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, t| {
            Some(match acc {
                None => (t.start.min(t.end), t.start.max(t.end)),
                Some((lo, hi)) => (lo.min(t.start).min(t.end), hi.max(t.start).max(t.end)),
            })
        });
        let (lo, hi) = span.unwrap_or((now, now));
        let start = lo - Duration::days(PADDING_DAYS);
        let end = hi + Duration::days(PADDING_DAYS);
        TimelineWindow { start, end, total_days: ceil_days(end - start).max(1) }
    }

    pub fn bar(&self, task: &Task) -> BarSpan {
        BarSpan {
            offset_days: ceil_days(task.start - self.start),
            duration_days: ceil_days(task.end - task.start),
        }
    }

    /// Column range `(first, len)` of a task's bar when the window is `width`
    /// columns wide. Bars are at least one column and never spill past the edge.
    pub fn columns(&self, task: &Task, width: u16) -> (u16, u16) {
        if width == 0 {
            return (0, 0);
        }
        let bar = self.bar(task);
        let scale = width as f64 / self.total_days as f64;
        let first = ((bar.offset_days as f64 * scale).floor() as i64).clamp(0, width as i64 - 1);
        let len = ((bar.duration_days as f64 * scale).round() as i64).clamp(1, width as i64 - first);
        (first as u16, len as u16)
    }

    /// Column of `instant`, if it falls inside the window.
    pub fn column_of(&self, instant: DateTime<Utc>, width: u16) -> Option<u16> {
        if instant < self.start || instant > self.end || width == 0 {
            return None;
        }
        let days = (instant - self.start).num_milliseconds() as f64 / 86_400_000.0;
        let col = (days * width as f64 / self.total_days as f64).floor() as u16;
        Some(col.min(width - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::fixtures::{jan, task};

    #[test]
    fn test_window_pads_a_week() {
        let tasks = vec![task(1, None, 8, 10, 0), task(2, None, 9, 20, 0)];
        let w = TimelineWindow::for_tasks(&tasks, jan(1));
        assert_eq!(w.start, jan(1));
        assert_eq!(w.end, jan(27));
        assert_eq!(w.total_days, 26);
        assert_eq!(w.bar(&tasks[1]), BarSpan { offset_days: 8, duration_days: 11 });
    }

    #[test]
    fn test_empty_window_centres_on_now() {
        let none: Vec<Task> = Vec::new();
        let w = TimelineWindow::for_tasks(&none, jan(15));
        assert_eq!((w.start, w.end, w.total_days), (jan(8), jan(22), 14));
    }

    #[test]
    fn test_columns_scale_and_clamp() {
        let tasks = vec![task(1, None, 8, 10, 0), task(2, None, 9, 20, 0)];
        let w = TimelineWindow::for_tasks(&tasks, jan(1));
        assert_eq!(w.columns(&tasks[1], 26), (8, 11));
        assert_eq!(w.columns(&tasks[0], 13), (3, 1));
        assert_eq!(w.columns(&tasks[0], 0), (0, 0));
        assert_eq!(w.column_of(jan(14), 26), Some(13));
        assert_eq!(w.column_of(jan(30), 26), None);
    }
}
