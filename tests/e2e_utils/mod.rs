#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod subscription_server;

pub use subscription_server::{subscription_blob, vmess_link, SubscriptionServer};
