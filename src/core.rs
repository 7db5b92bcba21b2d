pub mod activation;
pub mod cache;
pub mod cancellation;
pub mod clock;
pub mod device;
pub mod engine;
pub mod error;
pub mod rate;
pub mod ranking;
