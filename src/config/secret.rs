use rand::Rng;
use rand::rngs::OsRng;

const SECRET_LENGTH: usize = 50;
const SECRET_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*(-_=+)";

/// Generate a fresh application secret key from the OS RNG
pub fn generate() -> String {
    let mut rng = OsRng;
    (0..SECRET_LENGTH)
        .map(|_| SECRET_CHARS[rng.gen_range(0..SECRET_CHARS.len())] as char)
        .collect()
}

/// Pull `SECRET_KEY` out of an env-file excerpt, stripping quotes
pub fn extract_from_env(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("SECRET_KEY="))
        .map(|value| {
            value
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string()
        })
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_charset() {
        let key = generate();
        assert_eq!(key.len(), SECRET_LENGTH);
        assert!(key.bytes().all(|b| SECRET_CHARS.contains(&b)));
        assert_ne!(generate(), key);
    }

    #[test]
    fn test_extract_from_env() {
        assert_eq!(
            extract_from_env("SECRET_KEY=abc123\n"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_from_env("SECRET_KEY=\"quoted=value\"\n"),
            Some("quoted=value".to_string())
        );
        assert_eq!(
            extract_from_env("SECRET_KEY='single'"),
            Some("single".to_string())
        );
        assert_eq!(extract_from_env("SECRET_KEY=\n"), None);
        assert_eq!(extract_from_env(""), None);
        assert_eq!(extract_from_env("DEBUG=False\n"), None);
    }
}
