//! Immutable byte-slice value wrapper

use std::fmt;
use std::sync::Arc;

use hivelru::ByteCost;

/// Immutable view over an owned byte buffer.
///
/// Construction takes ownership of the bytes and the buffer is never
/// mutated afterward, so clones are cheap reference bumps and a view can
/// be handed to any number of readers. Mutable consumers take a fresh
/// copy via [`ByteView::to_vec`].
#[derive(Clone, PartialEq, Eq)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Length of the viewed buffer in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero-copy read-only projection of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Defensive copy for consumers that need to mutate.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Faithful string projection; `None` if the buffer is not UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Lossy string projection, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteView({:?})", String::from_utf8_lossy(&self.bytes))
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteCost for ByteView {
    fn cost(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byteview_projections() {
        let view = ByteView::from("630");

        assert_eq!(view.len(), 3);
        assert!(!view.is_empty());
        assert_eq!(view.as_slice(), b"630");
        assert_eq!(view.as_str(), Some("630"));
        assert_eq!(view.to_string_lossy(), "630");
        assert_eq!(view.cost(), 3);
    }

    #[test]
    fn test_byteview_copy_is_defensive() {
        let view = ByteView::from(b"hello".as_slice());

        let mut copy = view.to_vec();
        copy[0] = b'H';

        assert_eq!(view.as_slice(), b"hello");
    }

    #[test]
    fn test_byteview_clone_shares_buffer() {
        let view = ByteView::from(vec![1u8, 2, 3]);
        let clone = view.clone();

        assert_eq!(view, clone);
        assert!(std::ptr::eq(view.as_slice(), clone.as_slice()));
    }

    #[test]
    fn test_byteview_non_utf8() {
        let view = ByteView::from(vec![0xff, 0xfe]);

        assert_eq!(view.as_str(), None);
        assert!(!view.to_string_lossy().is_empty());
    }
}
