//! Bounded window of log lines, contiguous in absolute line number.
//!
//! The buffer is the single source of truth for what is in memory and
//! where it sits in the remote file. Absolute numbers are 1-based; an
//! empty buffer reports zero bounds. Insertion beyond capacity evicts
//! from the end opposite the insertion side, so a user paging upward
//! never loses the lines they are looking at.

use std::collections::VecDeque;

pub struct LineBuffer {
    lines: VecDeque<String>,
    /// Absolute number of `lines[0]`; meaningful only when non-empty.
    start: u64,
    /// Absolute number the next line appended into an empty buffer gets.
    origin: u64,
    max_lines: usize,
}

impl LineBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(4096)),
            start: 1,
            origin: 1,
            max_lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[allow(dead_code)]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Absolute number of the first buffered line, 0 when empty.
    pub fn start_line(&self) -> u64 {
        if self.lines.is_empty() { 0 } else { self.start }
    }

    /// Absolute number of the last buffered line, 0 when empty.
    pub fn end_line(&self) -> u64 {
        if self.lines.is_empty() {
            0
        } else {
            self.start + self.lines.len() as u64 - 1
        }
    }

    /// Clear to empty, zero bounds. The next append starts at line 1.
    pub fn reset(&mut self) {
        self.reset_at(1);
    }

    /// Clear to empty and set the absolute number the next appended line
    /// receives.
    pub fn reset_at(&mut self, origin: u64) {
        self.lines.clear();
        self.origin = origin.max(1);
        self.start = self.origin;
    }

    /// Add lines at the tail, advancing `end_line`. Evicts from the head
    /// if capacity is exceeded; returns how many were evicted.
    pub fn append<S: AsRef<str>>(&mut self, new: &[S]) -> usize {
        if self.lines.is_empty() {
            self.start = self.origin;
        }
        for line in new {
            self.lines.push_back(line.as_ref().to_string());
        }
        let mut evicted = 0;
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
            self.start += 1;
            evicted += 1;
        }
        evicted
    }

    /// Add lines at the head, moving `start_line` backward. Evicts from
    /// the tail if capacity is exceeded; returns how many were evicted.
    pub fn prepend<S: AsRef<str>>(&mut self, new: &[S]) -> usize {
        if self.lines.is_empty() {
            return self.append(new);
        }
        debug_assert!(self.start > new.len() as u64, "prepend below line 1");
        for line in new.iter().rev() {
            self.lines.push_front(line.as_ref().to_string());
        }
        self.start = self.start.saturating_sub(new.len() as u64).max(1);
        let mut evicted = 0;
        while self.lines.len() > self.max_lines {
            self.lines.pop_back();
            evicted += 1;
        }
        evicted
    }

    /// Iterate `(absolute number, text)` in window order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        let start = self.start;
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (start + i as u64, line.as_str()))
    }

    #[allow(dead_code)]
    pub fn get(&self, absolute: u64) -> Option<&str> {
        if self.lines.is_empty() || absolute < self.start {
            return None;
        }
        self.lines
            .get((absolute - self.start) as usize)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(range: std::ops::RangeInclusive<u64>) -> Vec<String> {
        range.map(|n| format!("line {}", n)).collect()
    }

    fn assert_contiguous(buf: &LineBuffer) {
        if buf.is_empty() {
            assert_eq!(buf.start_line(), 0);
            assert_eq!(buf.end_line(), 0);
        } else {
            assert_eq!(buf.len() as u64, buf.end_line() - buf.start_line() + 1);
        }
        assert!(buf.len() <= buf.max_lines());
    }

    #[test]
    fn test_empty_buffer_has_zero_bounds() {
        let buf = LineBuffer::new(100);
        assert!(buf.is_empty());
        assert_eq!(buf.start_line(), 0);
        assert_eq!(buf.end_line(), 0);
    }

    #[test]
    fn test_append_advances_end_line() {
        let mut buf = LineBuffer::new(100);
        buf.reset_at(501);
        buf.append(&lines(501..=1000));
        assert_eq!(buf.len(), 100);
        assert_contiguous(&buf);
    }

    #[test]
    fn test_append_evicts_from_head() {
        let mut buf = LineBuffer::new(10);
        let evicted = buf.append(&lines(1..=15));
        assert_eq!(evicted, 5);
        assert_eq!(buf.start_line(), 6);
        assert_eq!(buf.end_line(), 15);
        assert_eq!(buf.get(6), Some("line 6"));
        assert_eq!(buf.get(5), None);
        assert_contiguous(&buf);
    }

    #[test]
    fn test_prepend_evicts_from_tail() {
        let mut buf = LineBuffer::new(10);
        buf.reset_at(100);
        buf.append(&lines(100..=107));
        let evicted = buf.prepend(&lines(95..=99));
        assert_eq!(evicted, 3);
        assert_eq!(buf.start_line(), 95);
        assert_eq!(buf.end_line(), 104);
        assert_eq!(buf.get(95), Some("line 95"));
        assert_eq!(buf.get(105), None);
        assert_contiguous(&buf);
    }

    #[test]
    fn test_mixed_operations_hold_invariant() {
        let mut buf = LineBuffer::new(50);
        buf.reset_at(1000);
        buf.append(&lines(1000..=1029));
        assert_contiguous(&buf);
        buf.prepend(&lines(980..=999));
        assert_contiguous(&buf);
        buf.append(&lines(1030..=1059));
        assert_contiguous(&buf);
        buf.prepend(&lines(960..=979));
        assert_contiguous(&buf);
        assert_eq!(buf.len(), 50);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut buf = LineBuffer::new(100);
        buf.append(&lines(1..=20));
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.start_line(), 0);
        assert_eq!(buf.end_line(), 0);
        buf.reset();
        assert_eq!(buf.start_line(), 0);
    }

    #[test]
    fn test_reset_at_sets_origin_for_next_append() {
        let mut buf = LineBuffer::new(100);
        buf.reset_at(9501);
        assert_eq!(buf.start_line(), 0);
        buf.append(&lines(9501..=9510));
        assert_eq!(buf.start_line(), 9501);
        assert_eq!(buf.end_line(), 9510);
    }

    #[test]
    fn test_iter_yields_absolute_numbers() {
        let mut buf = LineBuffer::new(10);
        buf.reset_at(42);
        buf.append(&["a", "b", "c"]);
        let collected: Vec<(u64, String)> =
            buf.iter().map(|(n, s)| (n, s.to_string())).collect();
        assert_eq!(
            collected,
            vec![
                (42, "a".to_string()),
                (43, "b".to_string()),
                (44, "c".to_string()),
            ]
        );
    }
}
