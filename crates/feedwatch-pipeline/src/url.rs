//! Feed URL construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;

/// Characters escaped in a subject slug; unreserved URL characters pass through.
const SUBJECT_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const LOWERCASE_DIGITS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Builds the feed URL for `subject` with a random cache-busting query
/// parameter, so the feed is never served from an intermediate cache.
#[must_use]
pub fn subject_url(template: &str, subject: &str) -> String {
    subject_url_with(template, subject, &mut rand::rng())
}

pub(crate) fn subject_url_with<R: Rng + ?Sized>(template: &str, subject: &str, rng: &mut R) -> String {
    let encoded = utf8_percent_encode(subject, SUBJECT_SEGMENT).to_string();
    let base = template.replace("{subject}", &encoded);
    let key = random_token(rng, LOWERCASE, 5);
    let value = random_token(rng, LOWERCASE_DIGITS, 10);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{key}={value}")
}

fn random_token<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://coinmarketcap.com/community/coins/{subject}/latest/";

    fn split_query(url: &str) -> (&str, &str, &str) {
        let (base, query) = url.split_once('?').unwrap();
        let (key, value) = query.split_once('=').unwrap();
        (base, key, value)
    }

    #[test]
    fn substitutes_subject_and_appends_cache_buster() {
        let url = subject_url(TEMPLATE, "chainlink");
        let (base, key, value) = split_query(&url);

        assert_eq!(base, "https://coinmarketcap.com/community/coins/chainlink/latest/");
        assert_eq!(key.len(), 5);
        assert!(key.bytes().all(|b| b.is_ascii_lowercase()));
        assert_eq!(value.len(), 10);
        assert!(value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn cache_buster_differs_between_calls() {
        let first = subject_url(TEMPLATE, "bitcoin");
        let second = subject_url(TEMPLATE, "bitcoin");
        assert_ne!(first, second);
    }

    #[test]
    fn subject_is_percent_encoded() {
        let url = subject_url(TEMPLATE, "shiba inu/x");
        assert!(url.starts_with("https://coinmarketcap.com/community/coins/shiba%20inu%2Fx/latest/?"));
    }

    #[test]
    fn unreserved_characters_pass_through() {
        let url = subject_url(TEMPLATE, "shiba-inu");
        assert!(url.contains("/coins/shiba-inu/latest/"));
    }

    #[test]
    fn existing_query_uses_ampersand() {
        let url = subject_url("https://example.com/feed?coin={subject}", "eth");
        assert!(url.starts_with("https://example.com/feed?coin=eth&"));
    }
}
