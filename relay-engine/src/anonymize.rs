//! Response anonymization
//!
//! Cached responses are served to anonymous callers, so properties
//! that identify the owner's account or leak resource links can be
//! stripped before the content reaches the cache.

use serde_json::Value;

/// Properties removed from responses when anonymization is enabled.
/// A `:` separates nested object keys.
pub const PRIVATE_PROPERTIES: [&str; 5] =
    ["id", "query:ids", "selfLink", "nextLink", "profileInfo"];

/// Strip all [`PRIVATE_PROPERTIES`] from a response body. Paths that
/// do not exist in the content are skipped.
pub fn remove_private_keys(mut content: Value) -> Value {
    for path in PRIVATE_PROPERTIES {
        remove_path(&mut content, path);
    }
    content
}

fn remove_path(content: &mut Value, path: &str) {
    let mut parts: Vec<&str> = path.split(':').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut node = content;
    for part in parts {
        match node.get_mut(part) {
            Some(child) => node = child,
            None => return,
        }
    }
    if let Some(map) = node.as_object_mut() {
        map.remove(last);
    }
}

// ============================================================================
// Tests
// ============================================================================
