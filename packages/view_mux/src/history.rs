use std::collections::VecDeque;

/// Number of lines a stream keeps when no explicit capacity is given.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// How many lines a stream's history may hold.
///
/// A capacity of `Entries(0)` is valid and means the history never retains
/// anything: lines are still broadcast live, but a view switch replays nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Capacity {
    #[default]
    Default,
    Entries(usize),
}

impl Capacity {
    /// Build a capacity from a signed count, treating negatives as "use the default".
    pub fn from_signed(entries: i64) -> Self {
        match usize::try_from(entries) {
            Ok(n) => Capacity::Entries(n),
            Err(_) => Capacity::Default,
        }
    }

    /// The effective number of entries.
    pub fn get(self) -> usize {
        match self {
            Capacity::Default => DEFAULT_MAX_ENTRIES,
            Capacity::Entries(n) => n,
        }
    }
}

impl From<usize> for Capacity {
    fn from(entries: usize) -> Self {
        Capacity::Entries(entries)
    }
}

/// Fixed-capacity, insertion-ordered line history.
///
/// Lines are appended at the tail and evicted from the head once the buffer
/// is over capacity. Not synchronized; the owning stream serializes access.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    max_entries: usize,
    entries: VecDeque<String>,
}

impl HistoryBuffer {
    pub fn new(capacity: Capacity) -> Self {
        let max_entries = capacity.get();
        Self {
            max_entries,
            entries: VecDeque::with_capacity(max_entries.min(DEFAULT_MAX_ENTRIES)),
        }
    }

    /// Append a line, evicting the oldest entry if the buffer overflows.
    ///
    /// Lines that are empty after trimming are rejected and `false` is
    /// returned; nothing is stored or evicted for them.
    pub fn append(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }

        self.entries.push_back(line.to_string());
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        true
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = HistoryBuffer::new(Capacity::Entries(2));
        for line in ["a", "b", "c"] {
            assert!(history.append(line));
        }
        assert_eq!(history.snapshot(), vec!["b", "c"]);
    }

    #[test]
    fn keeps_most_recent_entries_in_order() {
        for capacity in [1usize, 3, 10] {
            for appended in 0..15usize {
                let mut history = HistoryBuffer::new(Capacity::Entries(capacity));
                let inputs: Vec<String> = (0..appended).map(|i| format!("line {}", i)).collect();
                for input in &inputs {
                    history.append(input);
                }

                let kept = appended.min(capacity);
                assert_eq!(history.len(), kept);
                assert_eq!(history.snapshot(), inputs[appended - kept..].to_vec());
            }
        }
    }

    #[test]
    fn blank_lines_are_rejected() {
        let mut history = HistoryBuffer::new(Capacity::Entries(2));
        history.append("keep");
        assert!(!history.append(""));
        assert!(!history.append("   \t"));
        assert_eq!(history.snapshot(), vec!["keep"]);
    }

    #[test]
    fn lines_are_stored_untrimmed() {
        let mut history = HistoryBuffer::new(Capacity::Default);
        history.append("  indented");
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["  indented"]);
    }

    #[test]
    fn zero_capacity_never_retains() {
        let mut history = HistoryBuffer::new(Capacity::Entries(0));
        assert!(history.append("gone"));
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 0);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let mut history = HistoryBuffer::new(Capacity::Entries(4));
        history.append("x");
        history.append("y");
        let first = history.snapshot();
        let second = history.snapshot();
        assert_eq!(first, second);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn capacity_from_signed() {
        assert_eq!(Capacity::from_signed(-1), Capacity::Default);
        assert_eq!(Capacity::from_signed(-1).get(), DEFAULT_MAX_ENTRIES);
        assert_eq!(Capacity::from_signed(0), Capacity::Entries(0));
        assert_eq!(Capacity::from_signed(100).get(), 100);
        assert_eq!(Capacity::from(7), Capacity::Entries(7));
    }
}
