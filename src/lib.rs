//! Property tax registry backend.
//!
//! Mirrors a remote registry of properties and their yearly tax payments,
//! classifies each property by payment status and turns the records into map
//! markers, search results and statistics.
//!
//! # Modules
//!
//! - `api`: HTTP command API.
//! - `core`: Classification, rendering and command dispatch.
//! - `integrations`: Remote registry client and synchronization.
//! - `config`: Configuration management.
//! - `coordinator`: Command dispatch over the shared registry state.
//! - `errors`: Error handling types.
//! - `forms`: Draft and edit form processing.
//! - `handlers`: HTTP request handlers.
//! - `models`: Record data models.
//! - `payment_status`: Payment tier classification.
//! - `popup`: Popup and search summary text.
//! - `record_store`: Local mirror of the remote records.
//! - `registry_client`: HTTP client for the remote registry.
//! - `search`: Attribute and proximity search.
//! - `statistics`: Reporting aggregates.
//! - `sync`: Mutate-then-reload synchronization.
//! - `visualization`: Marker production per view mode.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod payment_status;
pub mod popup;
pub mod record_store;
pub mod registry_client;
pub mod search;
pub mod statistics;
pub mod sync;
pub mod visualization;
