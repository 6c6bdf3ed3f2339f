//! Wire and domain types shared by the procurement listing client and its tools.

pub mod domain;
pub mod error;
pub mod protocol;
