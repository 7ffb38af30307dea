use crate::provider::ProviderHandle;
use core::fmt;
use std::rc::Rc;

/// Identifier of the chain the wallet is connected to.
///
/// Wallets usually report a hexadecimal string (`"0x1"`) but older ones
/// send a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ChainId {
    Number(u64),
    Text(String),
}

impl ChainId {
    /// numeric value of the chain identifier
    ///
    /// `"0x89"`, `"137"` and `137` all return `Some(137)`.
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            ChainId::Number(n) => Some(*n),
            ChainId::Text(text) => {
                let text = text.trim();
                if let Some(hex) = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                {
                    u64::from_str_radix(hex, 16).ok()
                } else {
                    text.parse().ok()
                }
            }
        }
    }
}

impl From<u64> for ChainId {
    fn from(n: u64) -> Self {
        ChainId::Number(n)
    }
}

impl From<&str> for ChainId {
    fn from(text: &str) -> Self {
        ChainId::Text(text.to_owned())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Number(n) => write!(f, "{n}"),
            ChainId::Text(text) => f.write_str(text),
        }
    }
}

/// Latest known connection state. Only the fields that changed are set.
#[derive(Clone, Default)]
pub struct ConnectorUpdate {
    pub provider: Option<ProviderHandle>,
    pub chain_id: Option<ChainId>,
    pub account: Option<String>,
}

impl ConnectorUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: ProviderHandle) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<ChainId>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// `true` if the update tells nothing beyond the provider handle.
    pub fn is_empty(&self) -> bool {
        self.chain_id.is_none() && self.account.is_none()
    }
}

impl PartialEq for ConnectorUpdate {
    fn eq(&self, other: &Self) -> bool {
        let same_provider = match (&self.provider, &other.provider) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_provider && self.chain_id == other.chain_id && self.account == other.account
    }
}

impl fmt::Debug for ConnectorUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorUpdate")
            .field("provider", &self.provider.as_ref().map(|_| ".."))
            .field("chain_id", &self.chain_id)
            .field("account", &self.account)
            .finish()
    }
}
