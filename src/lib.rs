//! Feedboard - multi-tenant feedback boards
//!
//! Owners create slugged boards with a set of categories; anyone with the
//! link can submit feedback and react to it. Board creation runs through a
//! compensating provisioning flow, see [`services::provisioning`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod store;
