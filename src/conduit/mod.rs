//! Phabricator Conduit API.
//!
//! [`ConduitApi`] is the transport boundary: one JSON call in, one JSON result
//! or structured error out. [`HttpConduit`] implements it over HTTP.
//! [`Phabricator`] layers the typed calls the commands need on top of any
//! transport, memoising lookups through an injected [`LookupCache`].

mod cache;
mod client;
mod http;

pub use cache::{LookupCache, MemoryCache};
pub use client::{CreatedDiff, Phabricator, Revision, RevisionHandle, file_name};
pub use http::{HttpConduit, parse_response};

use crate::error::Result;
use serde_json::Value;

/// Send a Conduit method call and return its `result` value.
///
/// Implementations must be shareable between upload workers.
pub trait ConduitApi: Sync {
    fn call(&self, method: &str, args: Value) -> Result<Value>;
}

impl<T: ConduitApi + ?Sized> ConduitApi for &T {
    fn call(&self, method: &str, args: Value) -> Result<Value> {
        (**self).call(method, args)
    }
}
