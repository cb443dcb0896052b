//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted during vessel mutation, reaction matching, and module
//! ticks, then delivered in batch at post-tick. Each event kind has its own
//! [`EventBuffer`] ring buffer with a configurable capacity. This is the
//! observability surface consumed by rendering/audio collaborators.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind. Suppressed events have zero cost.

use crate::fixed::Ticks;
use crate::id::{ChemicalId, ExperimentId, RuleId, VesselId};
use crate::reaction::EffectKind;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Sandbox / vessel --
    EffectStarted {
        effect: EffectKind,
        vessel: VesselId,
        duration: Ticks,
        tick: Ticks,
    },
    ReactionMatched {
        rule: RuleId,
        vessel: VesselId,
        products: Vec<ChemicalId>,
        tick: Ticks,
    },
    NoReaction {
        vessel: VesselId,
        tick: Ticks,
    },
    SafetyWarning {
        title: String,
        message: String,
        tick: Ticks,
    },

    // -- Modules --
    Boiling {
        vessel: VesselId,
        tick: Ticks,
    },
    FiltrationCompleted {
        destination: VesselId,
        tick: Ticks,
    },
    StirSettled {
        vessel: VesselId,
        tick: Ticks,
    },

    // -- Curriculum --
    PhaseCompleted {
        experiment: ExperimentId,
        phase: u8,
        tick: Ticks,
    },
    ResetPromptRaised {
        experiment: ExperimentId,
        tick: Ticks,
    },
    ExperimentCompleted {
        experiment: ExperimentId,
        tick: Ticks,
    },
}

/// Discriminant tag for event kinds, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EffectStarted,
    ReactionMatched,
    NoReaction,
    SafetyWarning,
    Boiling,
    FiltrationCompleted,
    StirSettled,
    PhaseCompleted,
    ResetPromptRaised,
    ExperimentCompleted,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::EffectStarted { .. } => EventKind::EffectStarted,
            Event::ReactionMatched { .. } => EventKind::ReactionMatched,
            Event::NoReaction { .. } => EventKind::NoReaction,
            Event::SafetyWarning { .. } => EventKind::SafetyWarning,
            Event::Boiling { .. } => EventKind::Boiling,
            Event::FiltrationCompleted { .. } => EventKind::FiltrationCompleted,
            Event::StirSettled { .. } => EventKind::StirSettled,
            Event::PhaseCompleted { .. } => EventKind::PhaseCompleted,
            Event::ResetPromptRaised { .. } => EventKind::ResetPromptRaised,
            Event::ExperimentCompleted { .. } => EventKind::ExperimentCompleted,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer — pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of events currently stored.
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Clear all events from the buffer.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only (UI, audio, analytics).
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Priority level for event listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Wraps a listener with priority, optional filter, and insertion order.
struct ListenerEntry {
    listener: PassiveListener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() { "Some(<fn>)" } else { "None" },
            )
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus. Holds one ring buffer per event kind, listener
/// lists, and suppression flags.
pub struct EventBus {
    /// One ring buffer per event kind, lazily allocated on first emit.
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],

    /// Suppressed event kinds. Suppressed events are never buffered.
    suppressed: [bool; EVENT_KIND_COUNT],

    /// Listeners indexed by event kind.
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],

    /// Default buffer capacity for new event buffers.
    default_capacity: usize,

    /// Monotonically increasing counter for stable sort ordering.
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    /// Check if an event kind is suppressed.
    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event. Stores it in the appropriate ring buffer. No-ops if
    /// the event kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let buffer = self.buffers[idx].get_or_insert_with(|| EventBuffer::new(self.default_capacity));
        buffer.push(event);
    }

    /// Register a passive listener with Normal priority and no filter.
    /// Listeners are called in registration order during delivery.
    pub fn on(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    /// Register a passive listener with explicit priority and optional filter.
    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.listeners[kind.index()].push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
    }

    /// Deliver all buffered events to listeners, then clear the buffers.
    /// Called at post-tick.
    ///
    /// For each kind with buffered events, listeners are sorted by
    /// `(priority, insertion_order)`, events are visited oldest-to-newest,
    /// and any listener whose filter rejects an event skips it.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            // Clone into a temporary Vec to avoid borrow conflicts between
            // the buffer and listeners.
            let events: Vec<Event> = buffer.iter().cloned().collect();

            self.listeners[idx].sort_by_key(|entry| (entry.priority as u8, entry.insertion_order));

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    /// Get the event buffer for a specific kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Does not remove listeners or suppression settings.
    pub fn clear_all(&mut self) {
        for buffer in &mut self.buffers {
            if let Some(b) = buffer.as_mut() {
                b.clear();
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
