//! SeaORM entities backing the persistence contracts.

pub mod message_log;
pub mod user;
