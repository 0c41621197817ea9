mod config;
pub use config::ClientConfig;

mod errors;
pub use errors::ClientError;

mod http;
pub use http::HttpControlPlane;
