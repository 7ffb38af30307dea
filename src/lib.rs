/*!

# Ethereum wallet connectors

This library is meant to be used by web applications that need to connect to
an Ethereum wallet installed in the browser (MetaMask and the likes). It
translates the wallet's provider ([EIP-1193]) into a small, uniform
connector interface.

## Features

- Detect the wallet injected at `window.ethereum`
- Request access to the user's accounts
- Follow chain and account changes
- Detect when the wallet disconnects the application

## Usage

Build the connector for the injected wallet and activate it. Activating
prompts the user if the application is not authorised yet:

```no_run
use ethereum_connector::{Connector as _, ConnectorArguments, injected};

# async fn test() -> anyhow::Result<()> {
let connector = injected(ConnectorArguments::new([1, 137]));
let update = connector.activate().await?;

if let Some(account) = update.account {
    println!("Connected as {account}");
}
# Ok(()) }
```

Chain and account changes are then published on the connector's
[`EventEmitter`]:

```no_run
use ethereum_connector::{Connector as _, ConnectorEvent, ConnectorEventKind};

# fn test(connector: ethereum_connector::InjectedConnector) {
connector.events().subscribe(ConnectorEventKind::Update, |event| {
    if let ConnectorEvent::Update(update) = event {
        println!("chain: {:?}, account: {:?}", update.chain_id, update.account);
    }
});
connector.events().subscribe(ConnectorEventKind::Deactivate, |_| {
    println!("the wallet disconnected");
});
# }
```

Logging goes through [`tracing`]; the application picks the subscriber.

[EIP-1193]: https://eips.ethereum.org/EIPS/eip-1193
*/

mod connector;
pub mod error;
mod ethereum;
mod events;
pub mod ffi;
mod injected;
pub mod provider;
mod update;

#[cfg(test)]
mod testing;

pub use self::{
    connector::{Connector, ConnectorArguments},
    error::ConnectorError,
    ethereum::{JsProvider, ethereum, injected},
    events::{ConnectorEvent, ConnectorEventKind, EventEmitter, ListenerId},
    injected::{ConnectorState, InjectedConnector},
    provider::{Provider, ProviderHandle},
    update::{ChainId, ConnectorUpdate},
};
