use crate::{
    connector::ConnectorArguments,
    error::{EventDecodeError, ProviderRpcError},
    ffi,
    injected::InjectedConnector,
    provider::{Listener, Provider, ProviderEvent, ProviderEventName, ProviderHandle, RequestArguments},
};
use async_trait::async_trait;
use serde::Serialize as _;
use serde_json::Value;
use std::{cell::RefCell, rc::Rc};
use tracing::{trace, warn};
use wasm_bindgen::{JsCast as _, JsValue, closure::Closure};

type JsListener = Closure<dyn Fn(JsValue, JsValue)>;

struct Registration {
    event: ProviderEventName,
    listener: Listener,
    closure: JsListener,
}

/// [`Provider`] backed by the `window.ethereum` object of the page.
pub struct JsProvider {
    ethereum: ffi::EthereumProvider,
    registrations: RefCell<Vec<Registration>>,
    /// closures removed from the provider; the one being removed may be
    /// running, so they are released on the next registration
    retired: RefCell<Vec<JsListener>>,
}

/// Build an [`InjectedConnector`] on the page's `window.ethereum`.
///
/// The connector is returned even if no wallet is installed: it will then
/// fail with [`ConnectorError::NoEthereumProvider`].
///
/// [`ConnectorError::NoEthereumProvider`]: crate::error::ConnectorError::NoEthereumProvider
pub fn injected(arguments: ConnectorArguments) -> InjectedConnector {
    let provider = ethereum().map(|provider| Rc::new(provider) as ProviderHandle);
    InjectedConnector::new(provider, arguments)
}

/// Look for the provider injected at `window.ethereum`.
///
/// Extensions may inject their provider after the page started, in which
/// case calling this function again later may find it.
pub fn ethereum() -> Option<JsProvider> {
    let fresh = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("window"))
        .ok()
        .and_then(|win| js_sys::Reflect::get(&win, &JsValue::from_str("ethereum")).ok())
        .filter(JsValue::is_object);

    match fresh {
        Some(ethereum) => Some(JsProvider::new(ethereum.unchecked_into())),
        None => ffi::eip1193::ETHEREUM.with(|opt| opt.clone().map(JsProvider::new)),
    }
}

impl JsProvider {
    pub fn new(ethereum: ffi::EthereumProvider) -> Self {
        Self {
            ethereum,
            registrations: RefCell::new(Vec::new()),
            retired: RefCell::new(Vec::new()),
        }
    }

    /// the raw javascript object
    pub fn inner(&self) -> &ffi::EthereumProvider {
        &self.ethereum
    }

    fn has_function(&self, name: &str) -> bool {
        js_sys::Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .map(|v| v.is_function())
            .unwrap_or(false)
    }
}

fn decode_event(event: ProviderEventName, raw: [JsValue; 2]) -> Result<ProviderEvent, EventDecodeError> {
    let mut args = Vec::with_capacity(raw.len());
    for value in raw {
        if value.is_undefined() {
            continue;
        }
        let value = serde_wasm_bindgen::from_value::<Value>(value)
            .map_err(<serde_json::Error as serde::de::Error>::custom)?;
        args.push(value);
    }
    ProviderEvent::decode(event, &args)
}

fn decode_rejection(error: JsValue) -> ProviderRpcError {
    match serde_wasm_bindgen::from_value::<ProviderRpcError>(error.clone()) {
        Ok(rejection) => rejection,
        Err(decode_error) => {
            let property = |name: &str| js_sys::Reflect::get(&error, &JsValue::from_str(name)).ok();
            let code = property("code").and_then(|code| code.as_f64());
            let message = property("message").and_then(|message| message.as_string());

            ProviderRpcError::from_parts(code, message).unwrap_or_else(|| {
                ProviderRpcError::internal(format!(
                    "Couldn't decode the error content: {decode_error} ({error:?})"
                ))
            })
        }
    }
}

#[async_trait(?Send)]
impl Provider for JsProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        let js_args = args
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|error| {
                ProviderRpcError::internal(format!("Couldn't encode the request: {error}"))
            })?;

        match self.ethereum.request(&js_args).await {
            Ok(result) => serde_wasm_bindgen::from_value(result).map_err(|decode_error| {
                ProviderRpcError::internal(format!(
                    "Couldn't decode the result of `{}': {decode_error}",
                    args.method
                ))
            }),
            Err(error) => Err(decode_rejection(error)),
        }
    }

    fn can_subscribe(&self) -> bool {
        self.has_function("on")
    }

    fn on(&self, event: ProviderEventName, listener: Listener) {
        self.retired.borrow_mut().clear();

        let callback = Rc::clone(&listener);
        let closure = JsListener::new(move |first: JsValue, second: JsValue| {
            match decode_event(event, [first, second]) {
                Ok(decoded) => callback(decoded),
                Err(error) => warn!(%event, %error, "Dropping undecodable provider event"),
            }
        });

        self.ethereum
            .on(event.as_str(), closure.as_ref().unchecked_ref());
        trace!(%event, "listener added to window.ethereum");

        self.registrations.borrow_mut().push(Registration {
            event,
            listener,
            closure,
        });
    }

    fn can_unsubscribe(&self) -> bool {
        self.has_function("removeListener")
    }

    fn remove_listener(&self, event: ProviderEventName, listener: &Listener) {
        let mut registrations = self.registrations.borrow_mut();
        let Some(position) = registrations.iter().position(|registration| {
            registration.event == event && Rc::ptr_eq(&registration.listener, listener)
        }) else {
            return;
        };

        let registration = registrations.remove(position);
        self.ethereum.remove_listener(
            event.as_str(),
            registration.closure.as_ref().unchecked_ref(),
        );
        trace!(%event, "listener removed from window.ethereum");

        self.retired.borrow_mut().push(registration.closure);
    }

    fn is_metamask(&self) -> bool {
        self.ethereum.is_metamask().unwrap_or(false)
    }

    fn set_auto_refresh_on_network_change(&self, enabled: bool) {
        self.ethereum.set_auto_refresh_on_network_change(enabled);
    }
}

impl Drop for JsProvider {
    fn drop(&mut self) {
        // the javascript side must not call into dropped closures
        if !self.can_unsubscribe() {
            return;
        }
        for registration in self.registrations.get_mut().drain(..) {
            self.ethereum.remove_listener(
                registration.event.as_str(),
                registration.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
