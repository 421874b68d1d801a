//! Scrollback history for the primary screen
//!
//! Lines evicted off the top of the primary grid land here, oldest first,
//! up to a fixed capacity. The alternate screen never feeds it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::line::Line;

/// Default maximum scrollback lines
pub const DEFAULT_SCROLLBACK_SIZE: usize = 10000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scrollback {
    lines: VecDeque<Line>,
    max_lines: usize,
}

impl Scrollback {
    pub fn new(max_lines: usize) -> Self {
        Self {
            // grows on demand rather than reserving the full capacity
            lines: VecDeque::with_capacity(max_lines.min(1024)),
            max_lines,
        }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a line, dropping the oldest once full
    pub fn push(&mut self, line: Line) {
        if self.max_lines == 0 {
            return;
        }
        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn push_lines(&mut self, lines: impl IntoIterator<Item = Line>) {
        for line in lines {
            self.push(line);
        }
    }

    /// 0 = oldest
    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Line> {
        self.lines.iter()
    }
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_line(text: &str) -> Line {
        let mut line = Line::new(text.len().max(10));
        for (i, c) in text.chars().enumerate() {
            if let Some(cell) = line.get_mut(i) {
                cell.set_char(c);
            }
        }
        line
    }

    #[test]
    fn test_scrollback_new() {
        let sb = Scrollback::new(100);
        assert_eq!(sb.max_lines(), 100);
        assert!(sb.is_empty());
    }

    #[test]
    fn test_scrollback_evicts_oldest() {
        let mut sb = Scrollback::new(3);
        for i in 1..=4 {
            sb.push(make_line(&format!("line{}", i)));
        }

        assert_eq!(sb.len(), 3);
        assert_eq!(sb.get(0).map(Line::text), Some("line2".to_string()));
        assert_eq!(sb.iter().next_back().map(Line::text), Some("line4".to_string()));
        assert!(sb.get(3).is_none());
    }

    #[test]
    fn test_scrollback_zero_capacity() {
        let mut sb = Scrollback::new(0);
        sb.push(make_line("gone"));
        assert!(sb.is_empty());
    }

    #[test]
    fn test_scrollback_iter_rev() {
        let mut sb = Scrollback::new(100);
        sb.push_lines(["a", "b", "c"].iter().map(|t| make_line(t)));

        let texts: Vec<_> = sb.iter().rev().map(Line::text).collect();
        assert_eq!(texts, vec!["c", "b", "a"]);
    }
}
