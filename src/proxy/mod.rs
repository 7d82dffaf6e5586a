//! Proxy Module
//!
//! Cache key derivation, the wire codec for stored responses, the upstream
//! fetcher and the mediator that ties them to the cache.

mod codec;
mod fetch;
mod headers;
mod key;
mod mediator;
mod message;


pub use codec::{decode_response, encode_response};
pub use fetch::{Fetcher, HttpFetcher};
pub use headers::{has_looped, strip_hop_by_hop, HOP_BY_HOP, VIA_TOKEN};
pub use key::CacheKey;
pub use mediator::{CacheStatus, ProxyMediator};
pub use message::{ProxyRequest, ProxyResponse};
