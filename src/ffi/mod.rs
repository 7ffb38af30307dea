pub mod eip1193;

pub use self::eip1193::EthereumProvider;
