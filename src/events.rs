use crate::{error::ConnectorError, update::ConnectorUpdate};
use core::fmt;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use tracing::trace;

/// Event published by a connector to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorEvent {
    Update(ConnectorUpdate),
    Error(ConnectorError),
    Deactivate,
}

impl ConnectorEvent {
    pub fn kind(&self) -> ConnectorEventKind {
        match self {
            Self::Update(_) => ConnectorEventKind::Update,
            Self::Error(_) => ConnectorEventKind::Error,
            Self::Deactivate => ConnectorEventKind::Deactivate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorEventKind {
    Update,
    Error,
    Deactivate,
}

impl fmt::Display for ConnectorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("Update"),
            Self::Error => f.write_str("Error"),
            Self::Deactivate => f.write_str("Deactivate"),
        }
    }
}

/// Handle returned by [`EventEmitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&ConnectorEvent)>;

struct Subscription {
    id: ListenerId,
    kind: ConnectorEventKind,
    callback: Callback,
}

/// Publish/subscribe registry for [`ConnectorEvent`]s.
///
/// Listeners are called synchronously, in the order they subscribed.
/// A listener may subscribe or unsubscribe from within its callback; the
/// change applies from the next [`EventEmitter::publish`].
#[derive(Default)]
pub struct EventEmitter {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listener_count", &self.subscriptions.borrow().len())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: ConnectorEventKind,
        callback: impl Fn(&ConnectorEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.subscriptions.borrow_mut().push(Subscription {
            id,
            kind,
            callback: Rc::new(callback),
        });

        trace!(listener = id.0, event = %kind, "listener subscribed");
        id
    }

    /// Returns `true` if the listener was found and removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        let removed = subscriptions.len() != before;

        if removed {
            trace!(listener = id.0, "listener unsubscribed");
        }

        removed
    }

    /// Deliver the event to every listener of its kind and return how many
    /// were called.
    pub fn publish(&self, event: &ConnectorEvent) -> usize {
        let kind = event.kind();
        // release the borrow before calling out
        let callbacks: Vec<Callback> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .map(|subscription| Rc::clone(&subscription.callback))
            .collect();

        for callback in &callbacks {
            callback(event);
        }

        callbacks.len()
    }

    pub fn listener_count(&self, kind: ConnectorEventKind) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.subscriptions.borrow_mut().clear();
    }
}
