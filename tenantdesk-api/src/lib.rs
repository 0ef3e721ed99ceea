//! # TenantDesk API Server Library
//!
//! HTTP surface of the TenantDesk workspace manager. Authorization, scope
//! and quota decisions live in `tenantdesk_shared::gate`; this crate wires
//! them into axum.
//!
//! ## Modules
//!
//! - `app`: application state, router and auth layer
//! - `bootstrap`: startup provisioning of the super admin
//! - `config`: configuration management
//! - `error`: error handling and HTTP response mapping
//! - `response`: success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
