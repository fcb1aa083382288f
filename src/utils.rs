//! Utility functions for document identifiers

use uuid7::uuid7;

pub const CODE_PREFIX: &str = "DOC-";
const CODE_LEN: usize = 8;

// hash a fresh uuid7 and keep the first 8 hex digits, upper-cased
pub fn new_document_code() -> String {
    let digest = sha256::digest(uuid7().as_bytes());
    format!("{CODE_PREFIX}{}", digest[..CODE_LEN].to_uppercase())
}

pub fn is_document_code(code: &str) -> bool {
    match code.strip_prefix(CODE_PREFIX) {
        Some(rest) => {
            rest.len() == CODE_LEN
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..64 {
            let code = new_document_code();
            assert!(is_document_code(&code), "malformed code {code}");
        }
    }

    #[test]
    fn generated_codes_differ() {
        let a = new_document_code();
        let b = new_document_code();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_foreign_shapes() {
        assert!(!is_document_code("DOC-abc12345"));
        assert!(!is_document_code("DOC-ABC1234"));
        assert!(!is_document_code("TRD-ABC12345"));
        assert!(is_document_code("DOC-ABC12345"));
    }
}
