pub mod types;

pub use types::{AppError, IngestError, ProxyError, ResolveError};
