pub mod reqwest_client;
pub mod tcp_prober;

pub use reqwest_client::ReqwestSubscriptionSource;
pub use tcp_prober::TcpProber;
