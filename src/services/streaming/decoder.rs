//! Guarded JSON decoding for untrusted stream payloads
//!
//! Upstream data is not trusted: a payload may be truncated, hostile, or
//! simply not JSON. Every failure funnels to `None` and is logged at debug
//! level only, since malformed frames are an expected operating condition.

use serde_json::Value;
use tracing::debug;

/// Default ceiling on payload size, in UTF-8 bytes
pub const DEFAULT_MAX_BYTES: usize = 1_048_576;

/// Default ceiling on nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Limits applied by [`decode_guarded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum payload size in UTF-8 encoded bytes
    pub max_bytes: usize,

    /// Maximum nesting depth; arrays and objects each count one level
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Decode `text` as JSON, returning `None` when it is malformed or breaks
/// either limit.
///
/// `str::len` is the UTF-8 byte length, so multi-byte characters are
/// counted at their encoded size.
#[must_use]
pub fn decode_guarded(text: &str, limits: &DecodeLimits) -> Option<Value> {
    if text.len() > limits.max_bytes {
        debug!(
            size = text.len(),
            limit = limits.max_bytes,
            "Rejected payload over size limit"
        );
        return None;
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Rejected malformed JSON payload");
            return None;
        }
    };

    let depth = json_depth(&value);
    if depth > limits.max_depth {
        debug!(depth, limit = limits.max_depth, "Rejected payload over depth limit");
        return None;
    }

    Some(value)
}

/// Nesting depth of a decoded value. Scalars are depth 0.
///
/// Walks with an explicit stack so a deep document cannot exhaust the call
/// stack.
#[must_use]
pub fn json_depth(value: &Value) -> usize {
    let mut max_depth = 0;
    let mut stack: Vec<(&Value, usize)> = vec![(value, 0)];

    while let Some((node, depth)) = stack.pop() {
        match node {
            Value::Array(items) => {
                let depth = depth + 1;
                max_depth = max_depth.max(depth);
                stack.extend(items.iter().map(|item| (item, depth)));
            }
            Value::Object(map) => {
                let depth = depth + 1;
                max_depth = max_depth.max(depth);
                stack.extend(map.values().map(|item| (item, depth)));
            }
            _ => {}
        }
    }

    max_depth
}
