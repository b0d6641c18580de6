pub mod activity_log;
pub mod blog_post;
pub mod content;
pub mod content_version;
pub mod donation;
pub mod donation_log;
pub mod form;
pub mod project;
pub mod receipt_sequence;
pub mod site_content;

pub use content::{ChangeType, ContentType, VersionedContent};
pub use donation::{Environment, PaymentStatus};
