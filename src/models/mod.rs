pub mod channel;
pub mod invoice;
pub mod outcome;
pub mod template;

pub use channel::{Channel, ChannelSet};
pub use invoice::{InvoiceRecord, RawRow};
pub use outcome::{BatchOutcome, BatchSummary, ChannelDelivery, OutcomeStatus};
pub use template::{InvoiceTemplate, TemplateVariant};
