//! Core trait abstractions for the discovery library.
//!
//! These traits define the interfaces that applications implement
//! to plug in backends, judges, HTTP access and result delivery.

pub mod judge;
pub mod page_client;
pub mod provider;
pub mod sink;
