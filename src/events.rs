//! Listener registry and event bookkeeping for the page runtime.

use std::collections::HashMap;
use std::fmt;

use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    MouseEnter,
    MouseLeave,
}

impl EventType {
    /// `mouseenter`/`mouseleave` are sent to each element the pointer crosses
    /// and never bubble.
    pub fn bubbles(self) -> bool {
        matches!(self, Self::Click)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::MouseEnter => "mouseenter",
            Self::MouseLeave => "mouseleave",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which component handler a registration routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Listener {
    DropdownTrigger,
    DropdownDocument,
    StarEnter(usize),
    StarLeave(usize),
    StarClick(usize),
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<EventType, Vec<Listener>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: EventType, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    /// Listeners for `node_id`, in registration order.
    pub(crate) fn get(&self, node_id: NodeId, event: EventType) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(&event))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self) -> usize {
        self.map
            .values()
            .flat_map(|events| events.values())
            .map(Vec::len)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: EventType,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
}

impl EventState {
    pub(crate) fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
        }
    }
}
