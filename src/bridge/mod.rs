//! Input forwarding to remote receivers and offscreen surface transfer.

pub(crate) mod events;
pub(crate) mod input;
pub(crate) mod offscreen;
pub(crate) mod receiver;
