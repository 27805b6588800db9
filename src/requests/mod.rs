pub mod loader;
pub mod classifier;

pub use loader::{load_email_list, load_requests, InputFormat, RequestRow, RequestTable};
pub use classifier::{classify, categorize, ClassifiedRequests, RequestCategory};
