pub mod logging;
pub mod wait;

pub use wait::{await_condition, WaitTimeout};
