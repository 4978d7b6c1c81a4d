pub mod content_service_http;
pub mod content_service_retrying;
pub mod memory_content_service;

pub use content_service_http::HttpContentService;
pub use content_service_retrying::{RetryPolicy, RetryingContentService};
pub use memory_content_service::MemoryContentService;
