use serde::Serialize;

/// Generation stamp of a request. Only the newest one may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Monotonic counter; `advance` supersedes every epoch handed out before.
#[derive(Debug, Clone, Default)]
pub struct EpochCounter {
    current: Epoch,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self) -> Epoch {
        self.current = Epoch(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Epoch {
        self.current
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_supersedes_older_epochs() {
        let mut counter = EpochCounter::new();
        let a = counter.advance();
        assert!(counter.is_current(a));
        let b = counter.advance();
        assert!(b > a);
        assert!(!counter.is_current(a));
        assert!(counter.is_current(b));
        assert_eq!(counter.current().get(), 2);
    }
}
