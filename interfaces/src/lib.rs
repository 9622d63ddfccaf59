pub mod defs;

pub use defs::{Notification, Post};
