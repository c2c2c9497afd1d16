//! Random codes and identifiers

use rand::Rng;

/// Generate a random 6-digit verification code
pub fn generate_verification_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100000..1000000);
    code.to_string()
}

/// Generate a random identifier for sessions, estimations and records
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Compare two codes without short-circuiting on the first differing byte
pub fn codes_match(expected: &str, given: &str) -> bool {
    let given = given.trim();
    if expected.len() != given.len() {
        return false;
    }
    expected
        .bytes()
        .zip(given.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_format() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.parse::<u32>().is_ok());
        }
    }

    #[test]
    fn test_id_uniqueness() {
        let s1 = generate_id();
        let s2 = generate_id();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("123456", "123456"));
        assert!(codes_match("123456", " 123456 "));
        assert!(!codes_match("123456", "123457"));
        assert!(!codes_match("123456", "12345"));
        assert!(!codes_match("123456", ""));
    }
}
