pub mod dispatcher;
pub mod pipeline;
pub mod reporter;

pub use dispatcher::{BatchDispatcher, DispatchOptions, NormalizedRow};
pub use pipeline::InvoicePipeline;
pub use reporter::{report, SendInvoicesResponse};
