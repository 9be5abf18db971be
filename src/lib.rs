pub mod builder;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod interpret;
pub mod model;
pub mod transport;

pub use crate::config::{ConfigSnapshot, Settings};
pub use crate::engine::{Decision, Delivery, Dispatcher};
pub use crate::interpret::Outcome;
pub use crate::model::{ActivityEvent, Heartbeat};
pub use crate::transport::http::HttpTransport;
