//! Chunked materialization of log lines into surface fragments.
//!
//! A huge batch (initial replay, a full history page, a re-filter of the
//! whole buffer) must not freeze the interaction thread. Jobs above the
//! chunk threshold are split into fixed-size fragments and emitted one
//! per `step` call; small jobs flush in a single step. The event loop
//! calls `step` once per tick, which is the only place fragments reach
//! the surface.

use std::collections::VecDeque;

use crate::buffer::LineBuffer;
use crate::filter::LineFilter;
use crate::surface::{Row, Surface};

enum JobKind {
    Append { sticky: bool },
    Prepend,
    Clear,
    SetVisible(bool),
}

struct Job {
    kind: JobKind,
    rows: Vec<Row>,
    /// Large jobs emit one chunk per step instead of flushing at once.
    chunked: bool,
    /// Next row to emit; counts from the front for appends and from the
    /// back for prepends.
    cursor: usize,
}

pub struct RenderScheduler {
    chunk_size: usize,
    chunk_threshold: usize,
    queue: VecDeque<Job>,
}

impl RenderScheduler {
    pub fn new(chunk_size: usize, chunk_threshold: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_threshold,
            queue: VecDeque::new(),
        }
    }

    fn push(&mut self, kind: JobKind, rows: Vec<Row>) {
        let chunked = rows.len() > self.chunk_threshold;
        self.queue.push_back(Job {
            kind,
            rows,
            chunked,
            cursor: 0,
        });
    }

    /// Queue rows for the end of the surface.
    pub fn append(&mut self, rows: Vec<Row>, sticky: bool) {
        if rows.is_empty() {
            return;
        }
        self.push(JobKind::Append { sticky }, rows);
    }

    /// Queue rows for the start of the surface.
    pub fn prepend(&mut self, rows: Vec<Row>) {
        if rows.is_empty() {
            return;
        }
        self.push(JobKind::Prepend, rows);
    }

    /// Drop all queued work and clear the surface on the next step.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.push(JobKind::Clear, Vec::new());
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.push(JobKind::SetVisible(visible), Vec::new());
    }

    /// Re-derive the whole view from the buffer: clear, then append every
    /// line that passes the filter. Queued work is dropped first; it
    /// described a view that no longer exists.
    pub fn rebuild(&mut self, buffer: &LineBuffer, filter: Option<&LineFilter>, sticky: bool) {
        self.queue.clear();
        self.push(JobKind::Clear, Vec::new());
        let rows = rows_from_buffer(buffer, filter);
        self.append(rows, sticky);
    }

    pub fn has_work(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Emit at most one fragment to the surface. Returns true while work
    /// remains.
    pub fn step(&mut self, surface: &mut dyn Surface) -> bool {
        let Some(mut job) = self.queue.pop_front() else {
            return false;
        };

        match job.kind {
            JobKind::Clear => surface.clear(),
            JobKind::SetVisible(visible) => surface.set_visible(visible),
            JobKind::Append { sticky } => {
                if !job.chunked {
                    surface.append(std::mem::take(&mut job.rows), sticky);
                } else {
                    let end = (job.cursor + self.chunk_size).min(job.rows.len());
                    let fragment = job.rows[job.cursor..end].to_vec();
                    surface.append(fragment, sticky);
                    job.cursor = end;
                    if job.cursor < job.rows.len() {
                        self.queue.push_front(job);
                    }
                }
            }
            JobKind::Prepend => {
                if !job.chunked {
                    surface.prepend(std::mem::take(&mut job.rows));
                } else {
                    // Emit tail-first so every intermediate state keeps
                    // the final row order and the anchor adjusts per
                    // fragment.
                    let remaining = job.rows.len() - job.cursor;
                    let take = remaining.min(self.chunk_size);
                    let from = job.rows.len() - job.cursor - take;
                    let fragment = job.rows[from..from + take].to_vec();
                    surface.prepend(fragment);
                    job.cursor += take;
                    if job.cursor < job.rows.len() {
                        self.queue.push_front(job);
                    }
                }
            }
        }

        !self.queue.is_empty()
    }
}

/// Materialize the buffer window as log rows, applying the filter.
pub fn rows_from_buffer(buffer: &LineBuffer, filter: Option<&LineFilter>) -> Vec<Row> {
    buffer
        .iter()
        .filter(|(_, text)| filter.map_or(true, |f| f.matches(text)))
        .map(|(number, text)| Row::log(number, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingSurface, SurfaceOp};

    fn rows(count: usize) -> Vec<Row> {
        (1..=count as u64).map(|n| Row::log(n, format!("line {}", n))).collect()
    }

    fn drain(scheduler: &mut RenderScheduler, surface: &mut RecordingSurface) -> usize {
        let mut calls = 0;
        while scheduler.has_work() {
            scheduler.step(surface);
            calls += 1;
        }
        calls
    }

    #[test]
    fn test_small_append_flushes_in_one_step() {
        let mut scheduler = RenderScheduler::new(100, 1000);
        let mut surface = RecordingSurface::new();
        scheduler.append(rows(300), true);
        scheduler.step(&mut surface);
        assert_eq!(surface.rows.len(), 300);
        assert!(!scheduler.has_work());
        assert_eq!(surface.ops, vec![SurfaceOp::Append { rows: 300, sticky: true }]);
    }

    #[test]
    fn test_large_append_is_chunked_across_steps() {
        let mut scheduler = RenderScheduler::new(100, 1000);
        let mut surface = RecordingSurface::new();
        scheduler.append(rows(2500), false);

        assert!(scheduler.step(&mut surface));
        assert_eq!(surface.rows.len(), 100);

        let remaining_steps = drain(&mut scheduler, &mut surface);
        assert_eq!(remaining_steps, 24);
        assert_eq!(surface.rows.len(), 2500);
        assert_eq!(surface.rows, rows(2500));
    }

    #[test]
    fn test_chunked_prepend_preserves_order_and_anchor() {
        let mut scheduler = RenderScheduler::new(100, 1000);
        let mut surface = RecordingSurface::new();
        surface.rows = vec![Row::log(9999, "existing")];

        scheduler.prepend(rows(1500));
        while scheduler.step(&mut surface) {}

        let mut expected = rows(1500);
        expected.push(Row::log(9999, "existing"));
        assert_eq!(surface.rows, expected);
        assert_eq!(surface.anchor_offset, 1500);
    }

    #[test]
    fn test_clear_drops_queued_work() {
        let mut scheduler = RenderScheduler::new(100, 1000);
        let mut surface = RecordingSurface::new();
        scheduler.append(rows(2500), false);
        scheduler.step(&mut surface);
        scheduler.clear();
        while scheduler.step(&mut surface) {}
        assert!(surface.rows.is_empty());
    }

    #[test]
    fn test_rebuild_derives_from_buffer_not_surface() {
        use crate::buffer::LineBuffer;
        use crate::filter::LineFilter;

        let mut buffer = LineBuffer::new(100);
        buffer.append(&["INFO ready", "ERROR bad disk", "INFO done"]);

        let mut scheduler = RenderScheduler::new(100, 1000);
        let mut surface = RecordingSurface::new();
        // Surface starts out of sync with the buffer on purpose.
        surface.rows = vec![Row::log(99, "stale row")];

        let filter = LineFilter::new("error");
        scheduler.rebuild(&buffer, filter.as_ref(), false);
        while scheduler.step(&mut surface) {}

        assert_eq!(surface.log_texts(), vec!["ERROR bad disk"]);
    }
}
