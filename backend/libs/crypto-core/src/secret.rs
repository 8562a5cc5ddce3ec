//! Signing-secret strength classification
//!
//! HS256 is only as strong as the shared secret. Services classify the
//! configured secret at startup and warn about weak ones; the secret itself is
//! never part of any output.

const MIN_SECRET_LENGTH: usize = 32; // 256 bits
const RECOMMENDED_SECRET_LENGTH: usize = 64; // 512 bits
const PATTERN_RUN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    /// Too short, low entropy, or patterned
    Weak,
    /// Meets the minimum
    Acceptable,
    /// Long and high entropy
    Strong,
}

impl SecretStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretStrength::Weak => "weak",
            SecretStrength::Acceptable => "acceptable",
            SecretStrength::Strong => "strong",
        }
    }
}

/// Classify an HMAC secret
///
/// - shorter than 32 bytes: weak
/// - Shannon entropy below 4 bits/byte: weak
/// - a run of 4 repeated or ascending bytes: weak
/// - at least 64 bytes with entropy >= 5 bits/byte: strong
pub fn classify_secret(secret: &[u8]) -> SecretStrength {
    if secret.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(secret);
    if entropy < 4.0 || has_obvious_patterns(secret) {
        return SecretStrength::Weak;
    }

    if secret.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Bits per byte, 0 to 8
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut repeated = 1;
    let mut ascending = 1;

    for pair in data.windows(2) {
        repeated = if pair[0] == pair[1] { repeated + 1 } else { 1 };
        ascending = if pair[1] as i16 - pair[0] as i16 == 1 {
            ascending + 1
        } else {
            1
        };

        if repeated >= PATTERN_RUN || ascending >= PATTERN_RUN {
            return true;
        }
    }

    false
}
