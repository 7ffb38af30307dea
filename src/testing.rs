//! Scriptable in-memory provider for the unit tests.

use crate::{
    error::{ProviderErrorCode, ProviderRpcError},
    provider::{Listener, Provider, ProviderEvent, ProviderEventName, RequestArguments},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
    rc::Rc,
    sync::{Arc, Mutex},
};
use tracing::subscriber::DefaultGuard;

type Hook = Box<dyn Fn(&FakeProvider)>;

pub(crate) struct FakeProvider {
    responses: RefCell<HashMap<String, Result<Value, ProviderRpcError>>>,
    listeners: RefCell<Vec<(ProviderEventName, Listener)>>,
    requests: RefCell<Vec<String>>,
    /// listener count observed when each request was issued
    listeners_at_request: RefCell<Vec<usize>>,
    during_request: RefCell<Option<Hook>>,
    subscribable: bool,
    unsubscribable: bool,
    metamask: bool,
    auto_refresh: Cell<Option<bool>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            listeners: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
            listeners_at_request: RefCell::new(Vec::new()),
            during_request: RefCell::new(None),
            subscribable: true,
            unsubscribable: true,
            metamask: false,
            auto_refresh: Cell::new(None),
        }
    }

    pub(crate) fn without_subscriptions(mut self) -> Self {
        self.subscribable = false;
        self.unsubscribable = false;
        self
    }

    pub(crate) fn without_listener_removal(mut self) -> Self {
        self.unsubscribable = false;
        self
    }

    pub(crate) fn metamask(mut self) -> Self {
        self.metamask = true;
        self
    }

    pub(crate) fn respond(self, method: &str, result: Value) -> Self {
        self.responses
            .borrow_mut()
            .insert(method.to_owned(), Ok(result));
        self
    }

    pub(crate) fn reject(self, method: &str, code: i64) -> Self {
        self.responses.borrow_mut().insert(
            method.to_owned(),
            Err(ProviderRpcError::new(
                ProviderErrorCode::from(code),
                "rejected by the fake provider",
            )),
        );
        self
    }

    /// run `hook` while the next requests are pending
    pub(crate) fn during_request(self, hook: impl Fn(&FakeProvider) + 'static) -> Self {
        *self.during_request.borrow_mut() = Some(Box::new(hook));
        self
    }

    pub(crate) fn into_handle(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// deliver `event` to the listeners registered under its name
    pub(crate) fn emit(&self, event: ProviderEvent) {
        let name = event.name();
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(registered, _)| *registered == name)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event.clone());
        }
    }

    pub(crate) fn listener_count(&self, name: ProviderEventName) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(registered, _)| *registered == name)
            .count()
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub(crate) fn listeners_at_request(&self) -> Vec<usize> {
        self.listeners_at_request.borrow().clone()
    }

    pub(crate) fn auto_refresh(&self) -> Option<bool> {
        self.auto_refresh.get()
    }
}

#[async_trait(?Send)]
impl Provider for FakeProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        self.requests.borrow_mut().push(args.method.clone());
        self.listeners_at_request
            .borrow_mut()
            .push(self.listeners.borrow().len());

        if let Some(hook) = self.during_request.borrow().as_ref() {
            hook(self);
        }

        self.responses
            .borrow()
            .get(&args.method)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProviderRpcError::new(
                    ProviderErrorCode::UnsupportedMethod,
                    format!("{} is not scripted", args.method),
                ))
            })
    }

    fn can_subscribe(&self) -> bool {
        self.subscribable
    }

    fn on(&self, event: ProviderEventName, listener: Listener) {
        self.listeners.borrow_mut().push((event, listener));
    }

    fn can_unsubscribe(&self) -> bool {
        self.unsubscribable
    }

    fn remove_listener(&self, event: ProviderEventName, listener: &Listener) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(position) = listeners
            .iter()
            .position(|(name, registered)| *name == event && Rc::ptr_eq(registered, listener))
        {
            listeners.remove(position);
        }
    }

    fn is_metamask(&self) -> bool {
        self.metamask
    }

    fn set_auto_refresh_on_network_change(&self, enabled: bool) {
        self.auto_refresh.set(Some(enabled));
    }
}

/// Formatted `tracing` output of the current thread, for asserting on logs.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// capture until the returned guard is dropped
    pub(crate) fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).contains(needle)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
