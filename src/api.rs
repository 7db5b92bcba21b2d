pub mod client;
pub mod esios;
pub mod heartbeat;
pub mod ifttt;
pub mod price_source;
pub mod webhook;
