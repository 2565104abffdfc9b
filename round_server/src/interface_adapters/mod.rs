// Interface adapters: wire protocol, network handling and storage backends.

pub mod http;
pub mod maps;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod stores;
