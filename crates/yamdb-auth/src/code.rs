//! Confirmation codes sent to users instead of passwords

use rand::RngCore as _;

pub const CODE_BYTES: usize = 20;

/// New random confirmation code - lowercase hex string
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base16ct::lower::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_BYTES * 2);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_codes_differ() {
        assert_ne!(generate_code(), generate_code());
    }
}
