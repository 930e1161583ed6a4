pub mod model_client;
pub mod scrubber_client;

// Re-export for convenience
pub use model_client::{HttpModelClient, ModelClient, ModelError, ModelReply};
pub use scrubber_client::{HttpScrubber, ScrubError, Scrubber};
