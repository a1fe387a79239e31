//! Mission operator for a remotely operated vehicle: drives the steering
//! and throttle actuators from commands received over a publish/subscribe
//! link and falls back to a safe neutral state when the link drops.

#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate slog;

pub mod config;
pub mod control;
pub mod errors;
pub mod link;
pub mod messages;
pub mod mock;
pub mod operator;
pub mod pwm;
pub mod util;
