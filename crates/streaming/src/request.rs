/// Identifies a feature query in issue order.
///
/// This is intentionally a small, copyable tag: a result is only applied if
/// its tag is still the most recently issued one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

/// Monotonic request tag allocator.
#[derive(Debug, Default)]
pub struct Sequencer {
    last_issued: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Request {
        self.last_issued += 1;
        Request(self.last_issued)
    }

    pub fn latest(&self) -> Option<Request> {
        (self.last_issued > 0).then_some(Request(self.last_issued))
    }

    /// `true` iff `req` is the most recently issued request.
    pub fn is_latest(&self, req: Request) -> bool {
        self.latest() == Some(req)
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, Sequencer};

    #[test]
    fn tags_increase_monotonically() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.latest(), None);
        let a = seq.next();
        let b = seq.next();
        assert!(b > a);
        assert_eq!(seq.latest(), Some(b));
    }

    #[test]
    fn only_latest_is_current() {
        let mut seq = Sequencer::new();
        let a = seq.next();
        assert!(seq.is_latest(a));
        let b = seq.next();
        assert!(!seq.is_latest(a));
        assert!(seq.is_latest(b));
        assert!(!seq.is_latest(Request(99)));
    }
}
