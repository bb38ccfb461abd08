//! Request dispatch: cache lookup, rate-limit admission, and the HTTP call.

pub mod dispatcher;
pub mod metrics;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use transport::{HttpResponse, HttpTransport, Transport};
