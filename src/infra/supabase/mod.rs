//! Supabase-hosted reference tables.
//!
//! [`StoreConfig`] reads the project URL and key from the environment.
//! [`SupabaseClient`] implements [`ReferenceApi`] over PostgREST.
//!
//! [`ReferenceApi`]: crate::services::reference_api::ReferenceApi

mod client;
mod config;

pub use client::SupabaseClient;
pub use config::StoreConfig;
