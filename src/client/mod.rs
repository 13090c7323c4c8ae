pub mod error;
pub mod job_client;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use job_client::JobClient;
pub use transport::{Headers, HttpTransport, RawResponse, Transport};
pub use types::{Intent, JobInput, JobRequest, JobStatus, RequestEncoding, WireRequest};
