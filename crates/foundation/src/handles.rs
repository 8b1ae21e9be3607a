/// Generational handle: `(slot index, generation)`.
///
/// A handle stays valid only while the slot it points at still carries the
/// same generation. Bumping the generation invalidates every copy at once.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(u32, u32); // (index, generation)

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }
}

/// Single-slot generation counter.
///
/// Hands out at most one live `Handle` at a time; `retire` invalidates it.
#[derive(Debug, Default)]
pub struct HandleSlot {
    generation: u32,
    live: bool,
}

impl HandleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh handle, invalidating any previously issued one.
    pub fn issue(&mut self) -> Handle {
        self.generation = self.generation.wrapping_add(1);
        self.live = true;
        Handle::new(0, self.generation)
    }

    /// Returns `true` if the slot was live and is now retired.
    pub fn retire(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        self.live = false;
        true
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.live && handle.index() == 0 && handle.generation() == self.generation
    }

    pub fn current(&self) -> Option<Handle> {
        self.live.then(|| Handle::new(0, self.generation))
    }
}
