use crate::{
    error::ConnectorError,
    events::{ConnectorEvent, EventEmitter},
    provider::ProviderHandle,
    update::{ChainId, ConnectorUpdate},
};
use async_trait::async_trait;
use tracing::debug;

/// Options shared by every connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorArguments {
    /// Networks the application is willing to work with.
    #[serde(default)]
    pub supported_chain_ids: Option<Vec<u64>>,
}

impl ConnectorArguments {
    pub fn new(supported_chain_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            supported_chain_ids: Some(supported_chain_ids.into_iter().collect()),
        }
    }

    /// check the given chain against [`Self::supported_chain_ids`]
    ///
    /// Every chain is accepted when no list was configured. Connectors never
    /// call this themselves, it is up to the application to decide what to
    /// do with an unsupported network.
    pub fn supports(&self, chain_id: &ChainId) -> bool {
        match &self.supported_chain_ids {
            None => true,
            Some(supported) => chain_id
                .to_u64()
                .is_some_and(|chain_id| supported.contains(&chain_id)),
        }
    }
}

/// Capabilities of a wallet connector.
///
/// State changes are reported through [`Connector::events`]: an `Update`
/// each time the chain or the account changes, an `Error` for failures
/// that do not belong to a call, and a `Deactivate` when the wallet
/// disconnected the application.
#[async_trait(?Send)]
pub trait Connector {
    /// Connect to the wallet, prompting the user if needed.
    async fn activate(&self) -> Result<ConnectorUpdate, ConnectorError>;

    async fn provider(&self) -> Option<ProviderHandle>;

    async fn chain_id(&self) -> Result<Option<ChainId>, ConnectorError>;

    async fn account(&self) -> Result<Option<String>, ConnectorError>;

    /// Release the subscriptions held on the wallet. Calling it more than
    /// once is harmless.
    fn deactivate(&self);

    fn events(&self) -> &EventEmitter;

    fn supported_chain_ids(&self) -> Option<&[u64]>;

    /// Publish an update. Updates carrying neither a chain nor an account
    /// are dropped.
    fn emit_update(&self, update: ConnectorUpdate) {
        if update.is_empty() {
            debug!(?update, "Dropping empty update");
            return;
        }
        debug!(?update, "Emitting 'Update'");
        self.events().publish(&ConnectorEvent::Update(update));
    }

    fn emit_error(&self, error: ConnectorError) {
        debug!(%error, "Emitting 'Error'");
        self.events().publish(&ConnectorEvent::Error(error));
    }

    fn emit_deactivate(&self) {
        debug!("Emitting 'Deactivate'");
        self.events().publish(&ConnectorEvent::Deactivate);
    }
}
