use std::collections::VecDeque;
use std::rc::Rc;

use foundation::{Generation, LayerUrl, Version};

/// A state change the render side must react to.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A new catalog generation replaced the previous one wholesale.
    CatalogReplaced { generation: Generation, layers: usize },
    VisibilityChanged { url: LayerUrl, visible: bool },
    ThresholdChanged { threshold: f64 },
    /// A layer's raw data became resident.
    DataArrived { url: LayerUrl, points: usize },
    FetchFailed { url: LayerUrl, reason: String },
    ApprovalChanged { version: Version, state: String },
}

impl StateChange {
    pub fn kind(&self) -> &'static str {
        match self {
            StateChange::CatalogReplaced { .. } => "catalog_replaced",
            StateChange::VisibilityChanged { .. } => "visibility_changed",
            StateChange::ThresholdChanged { .. } => "threshold_changed",
            StateChange::DataArrived { .. } => "data_arrived",
            StateChange::FetchFailed { .. } => "fetch_failed",
            StateChange::ApprovalChanged { .. } => "approval_changed",
        }
    }
}

/// Sequenced change record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub seq: u64,
    pub change: StateChange,
}

pub type Listener = Rc<dyn Fn(&Event)>;

/// Queued changes kept when nobody drains the bus.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Queue of state changes plus synchronous observers.
///
/// Observers see every change as it is emitted; the owner drains the queue
/// when it is ready to reconcile. The queue is bounded: past its capacity the
/// oldest events are dropped and counted.
pub struct EventBus {
    next_seq: u64,
    capacity: usize,
    dropped: u64,
    events: VecDeque<Event>,
    listeners: Vec<Listener>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_seq", &self.next_seq)
            .field("events", &self.events.len())
            .field("dropped", &self.dropped)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity: capacity.max(1),
            dropped: 0,
            events: VecDeque::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, change: StateChange) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let event = Event { seq, change };
        for l in &self.listeners {
            l(&event);
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
        seq
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events evicted from a full queue before anyone drained them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}
