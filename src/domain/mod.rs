pub mod cache;
pub mod coordinator;
pub mod decoder;
pub mod errors;
pub mod models;
pub mod service;

pub use cache::NodeCache;
pub use coordinator::ProbeCoordinator;
pub use decoder::{decode, decode_subscription};
pub use errors::*;
pub use models::*;
pub use service::NodeService;
