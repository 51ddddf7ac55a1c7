//! Pushgate HTTP API: signed-request authentication middleware, recipient
//! administration, and the push/broadcast/cancel acceptance surface.

pub mod middleware;
pub mod routes;
pub mod state;
