#![doc = include_str!("../README.md")]

mod builder;
mod error;
mod packet;
pub mod pipe;
mod random;
mod reduce;

pub use crate::builder::*;
pub use crate::error::*;
pub use crate::packet::*;
pub use crate::random::*;
pub use crate::reduce::*;
