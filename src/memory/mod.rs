// src/memory/mod.rs

use std::collections::VecDeque;

/// Prior conversation turns the interpreter can refer back to.
pub trait Memory {
    fn log(&mut self, role: &str, content: &str);
    fn read_all(&self) -> Vec<(String, String)>;
}

/// Bounded in-memory transcript; the oldest turns fall off first.
#[derive(Debug)]
pub struct Transcript {
    capacity: usize,
    entries: VecDeque<(String, String)>,
}

impl Transcript {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for Transcript {
    fn log(&mut self, role: &str, content: &str) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((role.to_string(), content.to_string()));
    }

    fn read_all(&self) -> Vec<(String, String)> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_turn_when_full() {
        let mut transcript = Transcript::with_capacity(2);
        transcript.log("user", "open the camera");
        transcript.log("assistant", "status: OK");
        transcript.log("user", "do it again");

        let entries = transcript.read_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("assistant".to_string(), "status: OK".to_string()));
    }
}
