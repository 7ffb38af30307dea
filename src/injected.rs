use crate::{
    connector::{Connector, ConnectorArguments},
    error::ConnectorError,
    events::EventEmitter,
    provider::{Listener, ProviderEvent, ProviderEventName, ProviderHandle, RequestArguments},
    update::{ChainId, ConnectorUpdate},
};
use async_trait::async_trait;
use core::fmt;
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};
use tracing::{debug, warn};

const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
const ETH_ACCOUNTS: &str = "eth_accounts";
const ETH_CHAIN_ID: &str = "eth_chainId";

/// Lifecycle of an [`InjectedConnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectorState {
    /// never activated
    #[default]
    Inactive,
    /// the accounts request is pending, provider events are forwarded
    Activating,
    Active,
    /// torn down, either by [`Connector::deactivate`] or by the wallet
    Deactivated,
}

impl ConnectorState {
    fn forwards_events(self) -> bool {
        matches!(self, Self::Activating | Self::Active)
    }
}

/// Connector for the EIP-1193 provider injected by browser wallets
/// (MetaMask and the likes) at `window.ethereum`.
///
/// The provider is given at construction, see [`crate::injected`] to
/// build one on the page's `window.ethereum`.
///
/// Cloning the connector gives another handle on the same connection.
#[derive(Clone)]
pub struct InjectedConnector {
    inner: Rc<Inner>,
}

struct Inner {
    provider: Option<ProviderHandle>,
    arguments: ConnectorArguments,
    events: EventEmitter,
    state: Cell<ConnectorState>,
    /// bumped by every `activate` and `deactivate`; listeners and pending
    /// activations from an older generation are ignored
    generation: Cell<u64>,
    subscriptions: RefCell<Option<Subscriptions>>,
}

struct Subscriptions {
    chain_changed: Listener,
    accounts_changed: Listener,
    disconnect: Listener,
}

impl Subscriptions {
    fn iter(&self) -> [(ProviderEventName, &Listener); 3] {
        [
            (ProviderEventName::ChainChanged, &self.chain_changed),
            (ProviderEventName::AccountsChanged, &self.accounts_changed),
            (ProviderEventName::Disconnect, &self.disconnect),
        ]
    }
}

impl fmt::Debug for InjectedConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedConnector")
            .field("has_provider", &self.inner.provider.is_some())
            .field("arguments", &self.inner.arguments)
            .field("state", &self.state())
            .field("events", &self.inner.events)
            .finish()
    }
}

impl InjectedConnector {
    pub fn new(provider: Option<ProviderHandle>, arguments: ConnectorArguments) -> Self {
        Self {
            inner: Rc::new(Inner {
                provider,
                arguments,
                events: EventEmitter::new(),
                state: Cell::new(ConnectorState::Inactive),
                generation: Cell::new(0),
                subscriptions: RefCell::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectorState {
        self.inner.state.get()
    }

    pub fn arguments(&self) -> &ConnectorArguments {
        &self.inner.arguments
    }

    /// Check if the user already authorised the application, i.e. if
    /// [`Connector::activate`] would succeed without prompting.
    ///
    /// Never fails: a missing provider or a failed request count as `false`.
    pub async fn is_authorized(&self) -> bool {
        let Some(provider) = &self.inner.provider else {
            return false;
        };

        match provider.request(RequestArguments::new(ETH_ACCOUNTS)).await {
            Ok(accounts) => serde_json::from_value::<Vec<String>>(accounts)
                .is_ok_and(|accounts| !accounts.is_empty()),
            Err(_) => false,
        }
    }

    fn require_provider(&self) -> Result<&ProviderHandle, ConnectorError> {
        self.inner
            .provider
            .as_ref()
            .ok_or(ConnectorError::NoEthereumProvider)
    }

    fn next_generation(&self) -> u64 {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        generation
    }

    fn listener(&self, generation: u64) -> Listener {
        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        Rc::new(move |event| {
            if let Some(inner) = inner.upgrade() {
                InjectedConnector { inner }.handle_event(generation, event);
            }
        })
    }

    fn subscribe(&self, provider: &ProviderHandle, generation: u64) {
        let subscriptions = Subscriptions {
            chain_changed: self.listener(generation),
            accounts_changed: self.listener(generation),
            disconnect: self.listener(generation),
        };

        for (event, listener) in subscriptions.iter() {
            provider.on(event, Rc::clone(listener));
        }

        *self.inner.subscriptions.borrow_mut() = Some(subscriptions);
    }

    fn unsubscribe(&self, provider: &ProviderHandle) {
        let Some(subscriptions) = self.inner.subscriptions.borrow_mut().take() else {
            return;
        };

        if provider.can_unsubscribe() {
            for (event, listener) in subscriptions.iter() {
                provider.remove_listener(event, listener);
            }
        } else {
            debug!("Provider cannot remove listeners, leaving them inert");
        }
    }

    fn handle_event(&self, generation: u64, event: ProviderEvent) {
        if generation != self.inner.generation.get() || !self.state().forwards_events() {
            debug!(event = %event.name(), state = ?self.state(), "Ignoring provider event");
            return;
        }

        match event {
            ProviderEvent::ChainChanged(chain_id) => {
                debug!(%chain_id, "Handling 'chainChanged' event");
                let mut update = ConnectorUpdate::new().with_chain_id(chain_id);
                update.provider = self.inner.provider.clone();
                self.emit_update(update);
            }
            ProviderEvent::AccountsChanged(accounts) => {
                debug!(?accounts, "Handling 'accountsChanged' event");
                match accounts.into_iter().next() {
                    Some(account) => self.emit_update(ConnectorUpdate::new().with_account(account)),
                    None => self.deactivated_by_wallet(),
                }
            }
            ProviderEvent::Disconnect { code, reason } => {
                debug!(?code, ?reason, "Handling 'disconnect' event");
                self.deactivated_by_wallet();
            }
        }
    }

    fn deactivated_by_wallet(&self) {
        // before emitting: listeners are allowed to call `deactivate`
        self.inner.state.set(ConnectorState::Deactivated);
        self.emit_deactivate();
    }
}

fn first_account(method: &str, result: Value) -> Option<String> {
    match serde_json::from_value::<Vec<String>>(result) {
        Ok(accounts) => accounts.into_iter().next(),
        Err(error) => {
            warn!(method, %error, "Unexpected accounts list");
            None
        }
    }
}

#[async_trait(?Send)]
impl Connector for InjectedConnector {
    async fn activate(&self) -> Result<ConnectorUpdate, ConnectorError> {
        let provider = Rc::clone(self.require_provider()?);

        self.unsubscribe(&provider);
        let generation = self.next_generation();
        self.inner.state.set(ConnectorState::Activating);

        // subscribe first so nothing is missed during the handshake
        if provider.can_subscribe() {
            self.subscribe(&provider, generation);
        }

        if provider.is_metamask() {
            provider.set_auto_refresh_on_network_change(false);
        }

        let still_current = || {
            self.inner.generation.get() == generation
                && self.state() == ConnectorState::Activating
        };

        let account = match provider
            .request(RequestArguments::new(ETH_REQUEST_ACCOUNTS))
            .await
        {
            Ok(accounts) => first_account(ETH_REQUEST_ACCOUNTS, accounts),
            Err(error) if error.is_user_rejection() => {
                if still_current() {
                    self.unsubscribe(&provider);
                    self.inner.state.set(ConnectorState::Inactive);
                }
                return Err(ConnectorError::UserRejectedRequest);
            }
            Err(error) => {
                warn!(%error, "eth_requestAccounts was unsuccessful");
                None
            }
        };

        if still_current() {
            self.inner.state.set(ConnectorState::Active);
        }

        let mut update = ConnectorUpdate::new().with_provider(provider);
        update.account = account;
        Ok(update)
    }

    async fn provider(&self) -> Option<ProviderHandle> {
        self.inner.provider.clone()
    }

    async fn chain_id(&self) -> Result<Option<ChainId>, ConnectorError> {
        let provider = self.require_provider()?;

        match provider.request(RequestArguments::new(ETH_CHAIN_ID)).await {
            Ok(Value::Null) => Ok(None),
            Ok(chain_id) => match serde_json::from_value(chain_id) {
                Ok(chain_id) => Ok(Some(chain_id)),
                Err(error) => {
                    warn!(%error, "Unexpected chain id");
                    Ok(None)
                }
            },
            Err(error) => {
                warn!(%error, "eth_chainId was unsuccessful");
                Ok(None)
            }
        }
    }

    async fn account(&self) -> Result<Option<String>, ConnectorError> {
        let provider = self.require_provider()?;

        match provider.request(RequestArguments::new(ETH_ACCOUNTS)).await {
            Ok(accounts) => Ok(first_account(ETH_ACCOUNTS, accounts)),
            Err(error) => {
                warn!(%error, "eth_accounts was unsuccessful");
                Ok(None)
            }
        }
    }

    fn deactivate(&self) {
        if let Some(provider) = &self.inner.provider {
            self.unsubscribe(provider);
        }
        self.next_generation();
        self.inner.state.set(ConnectorState::Deactivated);
    }

    fn events(&self) -> &EventEmitter {
        &self.inner.events
    }

    fn supported_chain_ids(&self) -> Option<&[u64]> {
        self.inner.arguments.supported_chain_ids.as_deref()
    }
}
