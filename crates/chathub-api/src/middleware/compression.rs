//! Response compression and request size layers.

use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Builds a compression layer (gzip).
pub fn build_compression_layer() -> CompressionLayer {
    CompressionLayer::new()
}

/// Rejects request bodies larger than `max_bytes` with 413.
pub fn build_body_limit_layer(max_bytes: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(max_bytes)
}
