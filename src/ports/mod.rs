pub mod reachability;
pub mod subscription;

pub use reachability::ReachabilityPort;
pub use subscription::SubscriptionSourcePort;
