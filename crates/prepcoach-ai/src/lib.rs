mod executor;
mod http;
mod traits;

pub use executor::{Executor, RequestError, RetryPolicy};
pub use http::{extract_text, HttpTransport, HttpTransportConfig};
pub use traits::{GenerationRequest, Transport, TransportError, TransportResponse};
