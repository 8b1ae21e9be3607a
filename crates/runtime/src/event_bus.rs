use std::collections::VecDeque;

/// Lifecycle and query events recorded by a map surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Initialized,
    InitFailed,
    Teardown,
    Visibility,
    QueryIssued,
    QueryResolved,
    QueryDiscarded,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Initialized => "initialized",
            EventKind::InitFailed => "init_failed",
            EventKind::Teardown => "teardown",
            EventKind::Visibility => "visibility",
            EventKind::QueryIssued => "query_issued",
            EventKind::QueryResolved => "query_resolved",
            EventKind::QueryDiscarded => "query_discarded",
        }
    }
}

/// Structured trace entry, tagged with the surface generation that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub generation: u32,
    pub kind: EventKind,
    pub message: String,
}

/// Events kept by `EventBus::new`.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Bounded log: once full, each new event evicts the oldest.
#[derive(Debug)]
pub struct EventBus {
    events: VecDeque<Event>,
    capacity: usize,
    evicted: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// `capacity` is clamped to at least one event.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn emit(&mut self, generation: u32, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(generation, kind = kind.as_str(), "{message}");
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(Event {
            generation,
            kind,
            message,
        });
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}
