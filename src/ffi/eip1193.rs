use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(thread_local_v2, js_namespace = ["window"], js_name = "ethereum")]
    pub static ETHEREUM: Option<EthereumProvider>;
}

#[wasm_bindgen]
extern "C" {
    /// The provider object injected by the wallet extension, as described
    /// in [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193).
    #[derive(Clone, PartialEq)]
    pub type EthereumProvider;

    /// Submit an RPC request (`{ method, params }`) to the wallet.
    ///
    /// The promise rejects with a `ProviderRpcError` (`{ code, message, data }`).
    #[wasm_bindgen(method, catch, js_name = "request")]
    pub async fn request(this: &EthereumProvider, args: &JsValue) -> Result<JsValue, JsValue>;

    /// Node.js `EventEmitter` style subscription. Not every wallet
    /// implements it, check with `Reflect` before calling.
    #[wasm_bindgen(method, js_name = "on")]
    pub fn on(this: &EthereumProvider, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(method, js_name = "removeListener")]
    pub fn remove_listener(this: &EthereumProvider, event: &str, listener: &js_sys::Function);

    /// Set by MetaMask (and by wallets pretending to be MetaMask).
    #[wasm_bindgen(method, getter, js_name = "isMetaMask")]
    pub fn is_metamask(this: &EthereumProvider) -> Option<bool>;

    /// Legacy MetaMask switch reloading the page when the network changes.
    #[wasm_bindgen(method, setter, js_name = "autoRefreshOnNetworkChange")]
    pub fn set_auto_refresh_on_network_change(this: &EthereumProvider, value: bool);
}
