use crate::provider::ProviderEventName;

/// Errors reported by a [`Connector`].
///
/// [`Connector`]: crate::Connector
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectorError {
    #[error("No provider was found.")]
    NoProvider,
    #[error("No Ethereum provider was found on window.ethereum.")]
    NoEthereumProvider,
    #[error("The user rejected the request.")]
    UserRejectedRequest,
    #[error(transparent)]
    Provider(#[from] ProviderRpcError),
}

/// Error codes defined by EIP-1193, plus the JSON-RPC internal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum ProviderErrorCode {
    #[error("The user rejected the request.")]
    UserRejectedRequest,
    #[error("The requested method and/or account has not been authorized by the user.")]
    Unauthorized,
    #[error("The provider does not support the requested method.")]
    UnsupportedMethod,
    /// The provider is disconnected from all chains.
    #[error("The provider is disconnected from all chains.")]
    Disconnected,
    /// The provider is not connected to the requested chain.
    #[error("The provider is disconnected from the specified chain.")]
    ChainDisconnected,
    #[error("Internal JSON-RPC error.")]
    InternalError,
    #[error("Unknown error code `{0}'")]
    Unknown(i64),
}

impl ProviderErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::InternalError => -32603,
            Self::Unknown(code) => code,
        }
    }

    /// javascript numbers are floats: accept them when they hold an `i64`
    pub fn from_f64(v: f64) -> Option<Self> {
        // `i64::MAX as f64` rounds up to 2^63, which is out of range
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            Some(Self::from(v as i64))
        } else {
            None
        }
    }
}

impl From<i64> for ProviderErrorCode {
    fn from(code: i64) -> Self {
        match code {
            4001 => Self::UserRejectedRequest,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            -32603 => Self::InternalError,
            unknown => Self::Unknown(unknown),
        }
    }
}

/// A rejected provider request, as thrown by the injected provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Deserialize)]
#[error("{code} {message}")]
pub struct ProviderRpcError {
    pub code: ProviderErrorCode,
    #[serde(default, deserialize_with = "lenient")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<serde_json::Value>,
}

/// only the code decides how a rejection is handled, a malformed message
/// or payload must not hide it
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    Ok(T::deserialize(deserializer).unwrap_or_default())
}

impl ProviderRpcError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Rebuild the error from its `code` and `message` properties, read one
    /// by one when the rejection could not be decoded as a whole.
    pub fn from_parts(code: Option<f64>, message: Option<String>) -> Option<Self> {
        let code = ProviderErrorCode::from_f64(code?)?;
        Some(Self::new(code, message.unwrap_or_default()))
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == ProviderErrorCode::UserRejectedRequest
    }
}

/// Failure to interpret the payload of a provider event.
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("Missing payload for the `{0}' event")]
    MissingPayload(ProviderEventName),
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl<'de> serde::Deserialize<'de> for ProviderErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = ProviderErrorCode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "Expecting an integer ProviderErrorCode")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ProviderErrorCode::from(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .map(ProviderErrorCode::from)
                    .map_err(|_| E::custom(format!("error code out of range: {v}")))
            }

            // javascript numbers may reach us as floats
            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ProviderErrorCode::from_f64(v)
                    .ok_or_else(|| E::custom(format!("error code is not an integer: {v}")))
            }
        }

        deserializer.deserialize_i64(Visitor)
    }
}
