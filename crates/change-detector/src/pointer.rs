//! JSON pointer (RFC 6901) helpers.

use std::borrow::Cow;

/// Escape one reference token (`~` becomes `~0`, `/` becomes `~1`).
pub fn escape(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

pub fn unescape(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Append an unescaped token to a pointer.
pub fn child(path: &str, token: &str) -> String {
    format!("{}/{}", path, escape(token))
}

pub fn index(path: &str, index: usize) -> String {
    format!("{}/{}", path, index)
}

/// Decoded first token of a pointer, `None` for the root pointer.
pub fn first_segment(path: &str) -> Option<Cow<'_, str>> {
    let rest = path.strip_prefix('/')?;
    let token = rest.split('/').next().unwrap_or(rest);
    Some(unescape(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_round_trip() {
        assert_eq!(escape("app.kubernetes.io/name"), "app.kubernetes.io~1name");
        assert_eq!(escape("a~b"), "a~0b");
        assert_eq!(unescape("app.kubernetes.io~1name"), "app.kubernetes.io/name");
        assert_eq!(unescape("~01"), "~1");
    }

    #[test]
    fn test_child_pointer_resolves_with_serde_json() {
        let doc = json!({"metadata": {"labels": {"app.kubernetes.io/name": "web"}}});
        let path = child(&child(&child("", "metadata"), "labels"), "app.kubernetes.io/name");
        assert_eq!(path, "/metadata/labels/app.kubernetes.io~1name");
        assert_eq!(doc.pointer(&path), Some(&json!("web")));
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(first_segment("/metadata/resourceVersion").as_deref(), Some("metadata"));
        assert_eq!(first_segment("/status").as_deref(), Some("status"));
        assert_eq!(first_segment("/a~1b/c").as_deref(), Some("a/b"));
        assert_eq!(first_segment(""), None);
    }
}
