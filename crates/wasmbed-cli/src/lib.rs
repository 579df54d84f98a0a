#![forbid(unsafe_code)]
#![deny(unused_must_use)]

pub mod config;
pub mod logging;
pub mod verify;
