/// Authentication and authorization primitives
///
/// - `jwt`: identity token issue and validation
/// - `password`: Argon2id hashing and strength policy
/// - `policy`: the role permission table
/// - `context`: the authenticated caller handed to handlers
///
/// Request-level orchestration of these pieces is in [`crate::gate`].

pub mod context;
pub mod jwt;
pub mod password;
pub mod policy;
