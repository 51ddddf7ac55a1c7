//! Delivery workers: the `Sender` capability, the sender registry, the
//! job-processing loop, and the concrete delivery channels.

pub mod sender;
pub mod senders;
pub mod worker;

pub use sender::{Sender, SenderRegistry};
pub use worker::Worker;
