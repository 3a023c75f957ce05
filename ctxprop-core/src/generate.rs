//! Generators for fields configured with `generate-if-absent`.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::config::Generator;

/// Process-wide monotonic counter backing `SEQUENCE`.
static SEQUENCE: AtomicU64 = AtomicU64::new(1);

const RANDOM_LEN: usize = 16;

/// Produce a fresh value for the given generator.
pub fn generate(generator: Generator) -> String {
    match generator {
        Generator::Uuid => uuid::Uuid::new_v4().to_string(),
        Generator::Ulid => ulid::Ulid::new().to_string(),
        Generator::Timestamp => chrono::Utc::now().timestamp_millis().to_string(),
        Generator::Sequence => SEQUENCE.fetch_add(1, Ordering::Relaxed).to_string(),
        Generator::Random => thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect(),
        Generator::Nanoid => nanoid::nanoid!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_hyphenated() {
        let v = generate(Generator::Uuid);
        assert_eq!(v.len(), 36);
        assert_eq!(v.matches('-').count(), 4);
    }

    #[test]
    fn ulid_is_26_chars() {
        assert_eq!(generate(Generator::Ulid).len(), 26);
    }

    #[test]
    fn sequence_is_monotonic() {
        let a: u64 = generate(Generator::Sequence).parse().unwrap();
        let b: u64 = generate(Generator::Sequence).parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn timestamp_parses_as_millis() {
        let v: i64 = generate(Generator::Timestamp).parse().unwrap();
        assert!(v > 1_600_000_000_000);
    }

    #[test]
    fn random_is_alphanumeric() {
        let v = generate(Generator::Random);
        assert_eq!(v.len(), RANDOM_LEN);
        assert!(v.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn nanoid_is_url_safe() {
        let v = generate(Generator::Nanoid);
        assert_eq!(v.len(), 21);
        assert!(v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
