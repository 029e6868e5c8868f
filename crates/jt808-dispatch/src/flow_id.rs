//! Flow ids for outgoing platform messages.

use chrono::{Local, Timelike};

/// Source of flow ids for responses.
pub trait FlowIdGenerator {
    fn next_flow_id(&mut self) -> u16;
}

/// Seconds since local midnight.
///
/// Two responses sent within the same second share an id, so this is only a
/// weak uniqueness source.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOfDay;

impl FlowIdGenerator for TimeOfDay {
    fn next_flow_id(&mut self) -> u16 {
        time_of_day_flow_id()
    }
}

/// Wrapping counter, unique per generator for 65536 consecutive responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential {
    next: u16,
}

impl Sequential {
    pub fn starting_at(next: u16) -> Self {
        Self { next }
    }
}

impl FlowIdGenerator for Sequential {
    fn next_flow_id(&mut self) -> u16 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Which generator a handler should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowIdMode {
    #[default]
    TimeOfDay,
    Sequential,
}

/// A generator selected at runtime from a [`FlowIdMode`].
#[derive(Debug, Clone, Copy)]
pub enum FlowIds {
    TimeOfDay(TimeOfDay),
    Sequential(Sequential),
}

impl FlowIds {
    pub fn new(mode: FlowIdMode) -> Self {
        match mode {
            FlowIdMode::TimeOfDay => Self::TimeOfDay(TimeOfDay),
            FlowIdMode::Sequential => Self::Sequential(Sequential::default()),
        }
    }
}

impl Default for FlowIds {
    fn default() -> Self {
        Self::new(FlowIdMode::default())
    }
}

impl FlowIdGenerator for FlowIds {
    fn next_flow_id(&mut self) -> u16 {
        match self {
            Self::TimeOfDay(g) => g.next_flow_id(),
            Self::Sequential(g) => g.next_flow_id(),
        }
    }
}

/// Seconds elapsed since local midnight (0..86400, truncated to 16 bits).
pub fn time_of_day_flow_id() -> u16 {
    Local::now().num_seconds_from_midnight() as u16
}
