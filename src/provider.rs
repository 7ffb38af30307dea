use crate::{
    error::{EventDecodeError, ProviderRpcError},
    update::ChainId,
};
use async_trait::async_trait;
use core::fmt;
use serde_json::Value;
use std::rc::Rc;

/// Opaque, shared handle on the wallet's provider object.
pub type ProviderHandle = Rc<dyn Provider>;

/// Callback registered on a provider event.
///
/// Listeners are identified by their `Rc` allocation: removing a listener
/// requires the same `Rc` that was given to [`Provider::on`].
pub type Listener = Rc<dyn Fn(ProviderEvent)>;

/// Arguments of an EIP-1193 `request` call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// The events a connector listens to on the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventName {
    ChainChanged,
    AccountsChanged,
    Disconnect,
}

impl ProviderEventName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChainChanged => "chainChanged",
            Self::AccountsChanged => "accountsChanged",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for ProviderEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded notification from the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    ChainChanged(ChainId),
    AccountsChanged(Vec<String>),
    Disconnect {
        code: Option<i64>,
        reason: Option<String>,
    },
}

impl ProviderEvent {
    pub fn name(&self) -> ProviderEventName {
        match self {
            Self::ChainChanged(_) => ProviderEventName::ChainChanged,
            Self::AccountsChanged(_) => ProviderEventName::AccountsChanged,
            Self::Disconnect { .. } => ProviderEventName::Disconnect,
        }
    }

    /// Build the event from the raw arguments the provider called the
    /// listener with.
    ///
    /// `disconnect` is emitted with a `ProviderRpcError` object by EIP-1193
    /// providers and with a `(code, reason)` pair by older ones; both are
    /// accepted, as is no argument at all.
    pub fn decode(name: ProviderEventName, args: &[Value]) -> Result<Self, EventDecodeError> {
        match name {
            ProviderEventName::ChainChanged => {
                let payload = args
                    .first()
                    .ok_or(EventDecodeError::MissingPayload(name))?;
                Ok(Self::ChainChanged(serde_json::from_value(payload.clone())?))
            }
            ProviderEventName::AccountsChanged => {
                let payload = args
                    .first()
                    .ok_or(EventDecodeError::MissingPayload(name))?;
                Ok(Self::AccountsChanged(serde_json::from_value(
                    payload.clone(),
                )?))
            }
            ProviderEventName::Disconnect => match args.first() {
                Some(Value::Object(error)) => Ok(Self::Disconnect {
                    code: error.get("code").and_then(Value::as_i64),
                    reason: error
                        .get("message")
                        .and_then(Value::as_str)
                        .map(ToOwned::to_owned),
                }),
                Some(code) => Ok(Self::Disconnect {
                    code: code.as_i64(),
                    reason: args.get(1).and_then(Value::as_str).map(ToOwned::to_owned),
                }),
                None => Ok(Self::Disconnect {
                    code: None,
                    reason: None,
                }),
            },
        }
    }
}

/// An EIP-1193 provider, as injected by a wallet extension.
///
/// Only [`Provider::request`] is mandatory: event subscription, the
/// MetaMask flag and the auto-refresh switch are optional on the injected
/// object and default to "not available".
#[async_trait(?Send)]
pub trait Provider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError>;

    /// `true` if [`Provider::on`] is available.
    fn can_subscribe(&self) -> bool {
        false
    }

    fn on(&self, _event: ProviderEventName, _listener: Listener) {}

    /// `true` if [`Provider::remove_listener`] is available.
    fn can_unsubscribe(&self) -> bool {
        false
    }

    fn remove_listener(&self, _event: ProviderEventName, _listener: &Listener) {}

    fn is_metamask(&self) -> bool {
        false
    }

    fn set_auto_refresh_on_network_change(&self, _enabled: bool) {}
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_arguments_json() {
        assert_eq!(
            serde_json::to_value(RequestArguments::new("eth_chainId")).unwrap(),
            json! { { "method": "eth_chainId" } }
        );
        assert_eq!(
            serde_json::to_value(
                RequestArguments::new("wallet_switchEthereumChain")
                    .with_params(json! { [{ "chainId": "0x1" }] })
            )
            .unwrap(),
            json! { {
                "method": "wallet_switchEthereumChain",
                "params": [{ "chainId": "0x1" }],
            }}
        );
    }

    #[test]
    fn decode_chain_changed() {
        assert_eq!(
            ProviderEvent::decode(ProviderEventName::ChainChanged, &[json! { "0x89" }]).unwrap(),
            ProviderEvent::ChainChanged(ChainId::from("0x89"))
        );
        assert_eq!(
            ProviderEvent::decode(ProviderEventName::ChainChanged, &[json! { 1 }]).unwrap(),
            ProviderEvent::ChainChanged(ChainId::from(1))
        );
        assert!(matches!(
            ProviderEvent::decode(ProviderEventName::ChainChanged, &[]),
            Err(EventDecodeError::MissingPayload(
                ProviderEventName::ChainChanged
            ))
        ));
    }

    #[test]
    fn decode_accounts_changed() {
        assert_eq!(
            ProviderEvent::decode(
                ProviderEventName::AccountsChanged,
                &[json! { ["0xABC", "0xDEF"] }]
            )
            .unwrap(),
            ProviderEvent::AccountsChanged(vec!["0xABC".to_owned(), "0xDEF".to_owned()])
        );
        assert_eq!(
            ProviderEvent::decode(ProviderEventName::AccountsChanged, &[json! { [] }]).unwrap(),
            ProviderEvent::AccountsChanged(Vec::new())
        );
        assert!(matches!(
            ProviderEvent::decode(ProviderEventName::AccountsChanged, &[json! { "0xABC" }]),
            Err(EventDecodeError::Json(_))
        ));
    }

    #[test]
    fn decode_disconnect() {
        assert_eq!(
            ProviderEvent::decode(
                ProviderEventName::Disconnect,
                &[json! { { "code": 4900, "message": "Disconnected" } }]
            )
            .unwrap(),
            ProviderEvent::Disconnect {
                code: Some(4900),
                reason: Some("Disconnected".to_owned()),
            }
        );
        assert_eq!(
            ProviderEvent::decode(
                ProviderEventName::Disconnect,
                &[json! { 1013 }, json! { "going away" }]
            )
            .unwrap(),
            ProviderEvent::Disconnect {
                code: Some(1013),
                reason: Some("going away".to_owned()),
            }
        );
        assert_eq!(
            ProviderEvent::decode(ProviderEventName::Disconnect, &[]).unwrap(),
            ProviderEvent::Disconnect {
                code: None,
                reason: None,
            }
        );
    }

    #[test]
    fn event_names() {
        assert_eq!(ProviderEventName::ChainChanged.as_str(), "chainChanged");
        assert_eq!(ProviderEventName::AccountsChanged.as_str(), "accountsChanged");
        assert_eq!(ProviderEventName::Disconnect.to_string(), "disconnect");
        assert_eq!(
            ProviderEvent::AccountsChanged(Vec::new()).name(),
            ProviderEventName::AccountsChanged
        );
    }
}
