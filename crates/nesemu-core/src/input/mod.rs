//! Controller input handling: $4016/$4017 strobe-and-shift protocol.

mod controller;

pub use controller::{Button, Controller};
