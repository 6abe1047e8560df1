//! API-credential rotation.
//!
//! Several primary keys are rotated round-robin so one request never burns a
//! single key's rate limit; one fallback key is reserved for the moment all
//! primaries have failed within a request. The cursor is process-wide and
//! advances under a mutex; the only observable consequence is which key a
//! request tries first.

use std::sync::Mutex;

/// Rotating credential set for the LLM upstream.
#[derive(Debug)]
pub struct KeyRing {
    primaries: Vec<String>,
    fallback: Option<String>,
    cursor: Mutex<usize>,
}

impl KeyRing {
    pub fn new(primaries: Vec<String>, fallback: Option<String>) -> Self {
        let primaries: Vec<String> = primaries.into_iter().filter(|k| !k.is_empty()).collect();
        let fallback = fallback.filter(|k| !k.is_empty());
        Self {
            primaries,
            fallback,
            cursor: Mutex::new(0),
        }
    }

    /// `true` when no credential of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.primaries.is_empty() && self.fallback.is_none()
    }

    pub fn primary_count(&self) -> usize {
        self.primaries.len()
    }

    /// Returns the next primary key and a loggable label, advancing the
    /// shared cursor.
    pub fn next_primary(&self) -> Option<(String, String)> {
        if self.primaries.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let index = *cursor % self.primaries.len();
        *cursor = (index + 1) % self.primaries.len();
        Some((
            self.primaries[index].clone(),
            format!("primary key #{}", index + 1),
        ))
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ring() {
        let ring = KeyRing::new(vec![], None);
        assert!(ring.is_empty());
        assert!(ring.next_primary().is_none());
        assert!(ring.fallback().is_none());
    }

    #[test]
    fn test_blank_keys_are_discarded() {
        let ring = KeyRing::new(vec![String::new()], Some(String::new()));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_round_robin_rotation() {
        let ring = KeyRing::new(vec!["k1".into(), "k2".into(), "k3".into()], None);
        let picks: Vec<String> = (0..5)
            .map(|_| ring.next_primary().unwrap().0)
            .collect();
        assert_eq!(picks, vec!["k1", "k2", "k3", "k1", "k2"]);
    }

    #[test]
    fn test_fallback_only() {
        let ring = KeyRing::new(vec![], Some("backup".into()));
        assert!(!ring.is_empty());
        assert_eq!(ring.primary_count(), 0);
        assert!(ring.next_primary().is_none());
        assert_eq!(ring.fallback(), Some("backup"));
    }

    #[test]
    fn test_key_labels_are_one_based() {
        let ring = KeyRing::new(vec!["k1".into(), "k2".into()], None);
        let (_, label) = ring.next_primary().unwrap();
        assert_eq!(label, "primary key #1");
        let (_, label) = ring.next_primary().unwrap();
        assert_eq!(label, "primary key #2");
    }
}
