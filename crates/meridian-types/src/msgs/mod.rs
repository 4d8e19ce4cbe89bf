//! Module message types

pub mod bank;
pub mod htlc;

pub use bank::{Input, MsgMultiSend, MsgSend, Output};
pub use htlc::{MsgClaimHtlc, MsgCreateHtlc, MsgRefundHtlc};
