//! Host identity from the cloud instance metadata service.

mod client;
mod provider;

pub use client::{ImdsClient, TOKEN_HEADER, TOKEN_TTL_HEADER};
pub use provider::{collect_instance, MetadataError, MetadataKey, MetadataProvider};
