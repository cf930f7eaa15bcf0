mod connection;
mod hub;

pub use connection::KeyConnection;
pub use hub::{ChangeHub, HubStats, KeyRoom};
