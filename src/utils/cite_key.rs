//! Citation key generation and collision resolution.
//!
//! Keys are the first author's surname followed by the year (`Smith2020`).
//! Collisions get `a`..`z` suffixes and, once those run out, a `_<count>`
//! suffix derived from the size of the key set.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::models::UNKNOWN_AUTHOR;

/// Generate a citation key that is not in `existing_keys`.
///
/// The function is pure: it never inserts the returned key. Callers that
/// assign several keys in one batch must add each result to the set before
/// the next call (or use a [`KeyRegistry`]).
///
/// ```
/// use std::collections::HashSet;
/// use bibresolve::utils::generate_key;
///
/// let mut keys = HashSet::new();
/// let first = generate_key(&["Smith, John".to_string()], 2020, &keys);
/// keys.insert(first.clone());
/// let second = generate_key(&["John Smith".to_string()], 2020, &keys);
///
/// assert_eq!(first, "Smith2020");
/// assert_eq!(second, "Smith2020a");
/// ```
pub fn generate_key(authors: &[String], year: i32, existing_keys: &HashSet<String>) -> String {
    let base = base_key(authors, year);

    if !existing_keys.contains(&base) {
        return base;
    }

    if let Some(key) = ('a'..='z')
        .map(|suffix| format!("{}{}", base, suffix))
        .find(|candidate| !existing_keys.contains(candidate))
    {
        return key;
    }

    let mut count = existing_keys.len();
    loop {
        let key = format!("{}_{}", base, count);
        if !existing_keys.contains(&key) {
            return key;
        }
        count += 1;
    }
}

/// The uncollided key: surname plus year, or `Unknown<year>`.
pub fn base_key(authors: &[String], year: i32) -> String {
    let surname = authors
        .first()
        .map(|author| surname(author))
        .map(|name| {
            name.chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    format!("{}{}", surname, year)
}

/// Surname of a display name in either `Last, First` or `First Last` form.
pub fn surname(author: &str) -> &str {
    match author.split_once(',') {
        Some((last, _)) => last.trim(),
        None => author.split_whitespace().last().unwrap_or(""),
    }
}

/// A key set shared between concurrently processed documents.
///
/// The lock is held only while a key is generated and inserted, so each
/// assignment sees every key handed out before it.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: Mutex<HashSet<String>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with keys that are already in use
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Mutex::new(keys.into_iter().map(Into::into).collect()),
        }
    }

    /// Generate a key and reserve it in one step
    pub fn assign(&self, authors: &[String], year: i32) -> String {
        self.with_keys(|keys| {
            let key = generate_key(authors, year, keys);
            keys.insert(key.clone());
            key
        })
    }

    /// Run `f` with exclusive access to the key set
    pub fn with_keys<T>(&self, f: impl FnOnce(&mut HashSet<String>) -> T) -> T {
        let mut guard = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.with_keys(|keys| keys.contains(key))
    }

    pub fn len(&self) -> usize {
        self.with_keys(|keys| keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current key set
    pub fn snapshot(&self) -> HashSet<String> {
        self.with_keys(|keys| keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn authors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_author_formats_share_surname() {
        let keys = HashSet::new();
        assert_eq!(generate_key(&authors(&["Smith, John"]), 2020, &keys), "Smith2020");
        assert_eq!(generate_key(&authors(&["John Smith"]), 2020, &keys), "Smith2020");
        assert_eq!(surname("Smith, John"), "Smith");
        assert_eq!(surname("John Smith"), "Smith");
    }

    #[test]
    fn test_surname_is_cleaned() {
        let keys = HashSet::new();
        assert_eq!(
            generate_key(&authors(&["O'Neil-Brown, Ann"]), 1999, &keys),
            "ONeilBrown1999"
        );
        assert_eq!(
            generate_key(&authors(&["van der Berg, Jan"]), 2001, &keys),
            "vanderBerg2001"
        );
    }

    #[test]
    fn test_no_authors() {
        let keys = HashSet::new();
        assert_eq!(generate_key(&[], 2024, &keys), "Unknown2024");
        assert_eq!(generate_key(&authors(&[""]), 2024, &keys), "Unknown2024");
        assert_eq!(generate_key(&authors(&["王小明"]), 2010, &keys), "Unknown2010");
    }

    #[test]
    fn test_collision_letters() {
        let mut keys: HashSet<String> = ["Smith2020".to_string()].into();
        assert_eq!(generate_key(&authors(&["Smith, J"]), 2020, &keys), "Smith2020a");
        keys.insert("Smith2020a".to_string());
        assert_eq!(generate_key(&authors(&["Smith, J"]), 2020, &keys), "Smith2020b");
    }

    #[test]
    fn test_collision_exhaustion_uses_count() {
        let mut keys: HashSet<String> = HashSet::new();
        keys.insert("Smith2020".to_string());
        for suffix in 'a'..='z' {
            keys.insert(format!("Smith2020{}", suffix));
        }
        assert_eq!(keys.len(), 27);
        assert_eq!(
            generate_key(&authors(&["Smith, J"]), 2020, &keys),
            "Smith2020_27"
        );
    }

    #[test]
    fn test_count_fallback_skips_taken_keys() {
        let mut keys: HashSet<String> = HashSet::new();
        keys.insert("Smith2020".to_string());
        for suffix in 'a'..='z' {
            keys.insert(format!("Smith2020{}", suffix));
        }
        keys.insert("Smith2020_28".to_string());
        assert_eq!(
            generate_key(&authors(&["Smith, J"]), 2020, &keys),
            "Smith2020_29"
        );
    }

    #[test]
    fn test_does_not_mutate_and_is_idempotent() {
        let keys: HashSet<String> = ["Doe2019".to_string()].into();
        let first = generate_key(&authors(&["Jane Doe"]), 2019, &keys);
        let second = generate_key(&authors(&["Jane Doe"]), 2019, &keys);
        assert_eq!(first, second);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_sequential_keys_are_distinct() {
        let mut keys = HashSet::new();
        for _ in 0..100 {
            let key = generate_key(&authors(&["Lee, K"]), 2015, &keys);
            assert!(keys.insert(key), "generated a duplicate key");
        }
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_registry_concurrent_assignment() {
        let registry = Arc::new(KeyRegistry::from_keys(["Lee2015"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| registry.assign(&["K. Lee".to_string()], 2015))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(all.insert(key));
            }
        }
        assert_eq!(all.len(), 80);
        assert_eq!(registry.len(), 81);
        assert!(registry.contains("Lee2015a"));
    }
}
