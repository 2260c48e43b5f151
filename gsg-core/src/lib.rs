pub mod bootstrap;
pub mod config;
pub mod error;
pub mod event_schedule;
pub mod layout;
pub mod logging;
pub mod session;
pub mod source;
pub mod streams;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{DisplayList, MultiStreamSession, PollOutcome};
pub use source::StreamSource;
pub use streams::OrderedStreamMap;
