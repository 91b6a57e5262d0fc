pub mod backup;
pub mod compose;
pub mod extractor;
pub mod identity;
pub mod image_payload;
pub mod key_store;
pub mod pipeline;
pub mod trust_workflow;
