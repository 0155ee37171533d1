#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod error;
pub(crate) mod transport;
pub mod util;

pub use transport::{EthAddr, TransportMessage};
