/// Database layer
///
/// - `pool`: PostgreSQL connection pool with bounded acquire and statement times
/// - `migrations`: embedded schema migrations
///
/// Models live in [`crate::models`].

pub mod migrations;
pub mod pool;
