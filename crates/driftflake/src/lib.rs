#![doc = include_str!("../README.md")]

mod builder;
mod error;
mod generator;
mod id;
mod machine_id;
mod mutex;
mod time;

pub use crate::builder::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::machine_id::*;
pub use crate::time::*;

#[cfg(test)]
mod tests;
