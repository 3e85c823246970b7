pub mod http_client_factory;
pub mod transport;

pub use http_client_factory::http_client_factory;
pub use transport::BackendResponseError;
