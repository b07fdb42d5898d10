//! # Order Numbers
//!
//! Short, human-facing order identifiers.
//!
//! ## Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   2026-01-05 09:03 UTC                                                  │
//! │        │                                                                │
//! │        ▼  truncate to the minute, YY + month (no zero pad) + DDHHMM     │
//! │   261050903                                                             │
//! │        │                                                                │
//! │        ▼  Sqids over ABCDEFGHIJKLMNPRSTUVWXYZ1234567890, min length 4   │
//! │   "<sqid>"                                                              │
//! │        │                                                                │
//! │        ▼  + "-" + 6 upper-case hex chars from a fresh UUID v4           │
//! │   "<sqid>-3FA91C"                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The timestamp half means two numbers can only collide when both orders
//! were placed in the same wall-clock minute; the suffix separates those
//! statistically. Collisions are still possible and are absorbed by the
//! insert retry in the order repository, backed by `UNIQUE(order_number)`.
//!
//! Sqids is the same cross-language algorithm the storefront has always
//! used, so numbers stay byte-compatible with the ones already issued.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use sqids::Sqids;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Alphabet for the timestamp half. No `O`, no `Q`.
pub const ALPHABET: &str = "ABCDEFGHIJKLMNPRSTUVWXYZ1234567890";

/// Minimum length of the encoded timestamp half.
pub const MIN_ENCODED_LEN: u8 = 4;

/// Length of the random hex suffix.
pub const SUFFIX_LEN: usize = 6;

// =============================================================================
// Encoder
// =============================================================================

fn codec() -> CoreResult<&'static Sqids> {
    static CODEC: OnceLock<Result<Sqids, sqids::Error>> = OnceLock::new();

    CODEC
        .get_or_init(|| {
            Sqids::builder()
                .alphabet(ALPHABET.chars().collect())
                .min_length(MIN_ENCODED_LEN)
                .build()
        })
        .as_ref()
        .map_err(|e| CoreError::OrderNumber {
            reason: e.to_string(),
        })
}

/// Encodes a minute stamp with Sqids over [`ALPHABET`], at least
/// [`MIN_ENCODED_LEN`] characters long.
///
/// ## Example
/// ```rust
/// use eshop_core::order_number::{decode, encode};
///
/// let encoded = encode(261050903).unwrap();
/// assert!(encoded.len() >= 4);
/// assert_eq!(decode(&encoded), Some(261050903));
/// ```
pub fn encode(value: u64) -> CoreResult<String> {
    let encoded = codec()?
        .encode(&[value])
        .map_err(|e| CoreError::OrderNumber {
            reason: e.to_string(),
        })?;
    Ok(encoded.to_uppercase())
}

/// Reverses [`encode`]. Returns `None` unless `encoded` holds exactly one
/// number.
pub fn decode(encoded: &str) -> Option<u64> {
    match codec().ok()?.decode(encoded).as_slice() {
        [value] => Some(*value),
        _ => None,
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Minute stamp of `now`: two-digit year, month without a leading zero,
/// then zero-padded day, hour and minute.
pub fn minute_stamp(now: DateTime<Utc>) -> u64 {
    // Formatting only yields ASCII digits, so the parse cannot fail.
    now.format("%y%-m%d%H%M").to_string().parse().unwrap_or_default()
}

/// Builds an order number for `now` with an explicit suffix.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use eshop_core::order_number::order_number_at;
///
/// let now = Utc.with_ymd_and_hms(2026, 10, 19, 14, 7, 42).unwrap();
/// let number = order_number_at(now, "3fa91c").unwrap();
/// assert!(number.ends_with("-3FA91C"));
/// ```
pub fn order_number_at(now: DateTime<Utc>, suffix: &str) -> CoreResult<String> {
    Ok(format!("{}-{}", encode(minute_stamp(now))?, suffix.to_uppercase()))
}

/// Six upper-case hex characters cut from a fresh UUID v4.
pub fn random_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(SUFFIX_LEN);
    hex.to_uppercase()
}

/// Produces a new order number for the current minute.
pub fn generate_order_number() -> CoreResult<String> {
    order_number_at(Utc::now(), &random_suffix())
}

/// Source of candidate order numbers for the order repository.
///
/// The repository asks for a fresh candidate on every insert attempt.
pub trait OrderNumberGenerator: Send + Sync {
    fn generate(&self) -> CoreResult<String>;
}

/// Clock + UUID backed generator used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinuteStampGenerator;

impl OrderNumberGenerator for MinuteStampGenerator {
    fn generate(&self) -> CoreResult<String> {
        generate_order_number()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_encode_meets_min_length() {
        for value in [0, 1, 33, 34] {
            let encoded = encode(value).unwrap();
            assert!(encoded.len() >= MIN_ENCODED_LEN as usize, "{encoded}");
        }
    }

    #[test]
    fn test_encode_is_reversible() {
        for value in [0, 1, 33, 34, 1_000_000, 261_050_903, 2_610_191_407, 9_912_312_359] {
            assert_eq!(decode(&encode(value).unwrap()), Some(value), "value {}", value);
        }
    }

    #[test]
    fn test_encode_stays_inside_alphabet() {
        let encoded = encode(2_610_191_407).unwrap();
        assert!(encoded.chars().all(|c| ALPHABET.contains(c)), "{encoded}");
        assert_eq!(encode(2_610_191_407).unwrap(), encoded);
        assert_ne!(encode(2_610_191_408).unwrap(), encoded);
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        assert_eq!(decode("AB-C"), None);
        assert_eq!(decode("O000"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_alphabet_has_no_duplicates_and_no_letter_o() {
        let unique: HashSet<_> = ALPHABET.chars().collect();
        assert_eq!(unique.len(), ALPHABET.len());
        assert!(!ALPHABET.contains('O'));
    }

    #[test]
    fn test_minute_stamp_truncates_seconds() {
        let a = Utc.with_ymd_and_hms(2026, 1, 5, 9, 3, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 5, 9, 3, 59).unwrap();
        assert_eq!(minute_stamp(a), 261050903);
        assert_eq!(minute_stamp(a), minute_stamp(b));

        let october = Utc.with_ymd_and_hms(2026, 10, 19, 14, 7, 42).unwrap();
        assert_eq!(minute_stamp(october), 2610191407);
    }

    #[test]
    fn test_order_number_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 14, 7, 42).unwrap();
        let number = order_number_at(now, "3fa91c").unwrap();
        let (head, tail) = number.split_once('-').unwrap();

        assert_eq!(decode(head), Some(2610191407));
        assert_eq!(tail, "3FA91C");
    }

    #[test]
    fn test_generated_numbers_have_hex_suffix() {
        let number = generate_order_number().unwrap();
        let (head, tail) = number.split_once('-').unwrap();
        assert!(head.len() >= MIN_ENCODED_LEN as usize);
        assert_eq!(tail.len(), SUFFIX_LEN);
        assert!(tail.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_same_minute_shares_prefix() {
        let numbers: Vec<String> = (0..50).map(|_| MinuteStampGenerator.generate().unwrap()).collect();
        let prefixes: HashSet<_> = numbers
            .iter()
            .filter_map(|n| n.split_once('-').map(|(head, _)| head.to_string()))
            .collect();
        // A minute boundary may fall inside the loop.
        assert!(prefixes.len() <= 2);
    }
}
