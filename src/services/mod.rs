//! Business logic shared between the ingestion pipeline and the web layer.

pub mod classifier;
pub mod credentials;
pub mod resolver;
pub mod stream_proxy;

pub use credentials::CredentialRewriter;
pub use resolver::DirectStreamResolver;
pub use stream_proxy::StreamProxyService;
