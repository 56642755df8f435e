//! CPF (Cadastro de Pessoas Físicas) validation.
//!
//! A CPF is 11 digits: nine base digits followed by two check digits, each
//! computed as a weighted sum mod 11. Punctuation (`529.982.247-25`) is
//! ignored.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const CPF_LENGTH: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CpfError {
    #[error("CPF must have 11 digits, got {0}")]
    WrongLength(usize),

    #[error("CPF cannot be a single repeated digit")]
    RepeatedDigits,

    #[error("CPF check digits do not match")]
    ChecksumMismatch,
}

/// Returns true if `input` is a well-formed CPF with valid check digits.
pub fn validate_cpf(input: &str) -> bool {
    Cpf::parse(input).is_ok()
}

/// A CPF whose check digits have been verified. Stored as digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl Cpf {
    pub fn parse(input: &str) -> Result<Self, CpfError> {
        let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != CPF_LENGTH {
            return Err(CpfError::WrongLength(digits.len()));
        }

        // Placeholder values like 000.000.000-00 pass the arithmetic, reject them first
        if digits.iter().all(|d| *d == digits[0]) {
            return Err(CpfError::RepeatedDigits);
        }

        if check_digit(&digits[..9]) != digits[9] || check_digit(&digits[..10]) != digits[10] {
            return Err(CpfError::ChecksumMismatch);
        }

        Ok(Self(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect()))
    }

    /// Digits only, e.g. `52998224725`.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Display form, e.g. `529.982.247-25`.
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }
}

/// Weighted sum over `digits` with weights `len+1 .. 2`, folded to a single digit.
fn check_digit(digits: &[u32]) -> u32 {
    let top_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top_weight - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 | 11 => 0,
        d => d,
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl std::str::FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Cpf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cpf {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Cpf::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[&str] = &["52998224725", "11144477735", "39053344705", "86288366757"];

    #[test]
    fn test_known_valid_cpfs() {
        for cpf in VALID {
            assert!(validate_cpf(cpf), "{} should be valid", cpf);
        }
    }

    #[test]
    fn test_punctuation_is_ignored() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(cpf.digits(), "52998224725");
        assert_eq!(cpf.formatted(), "529.982.247-25");
    }

    #[test]
    fn test_repeated_digits_rejected() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert_eq!(Cpf::parse(&cpf), Err(CpfError::RepeatedDigits), "{}", cpf);
        }
    }

    #[test]
    fn test_all_ones_is_invalid() {
        assert!(!validate_cpf("11111111111"));
        assert_eq!(Cpf::parse("111.111.111-11"), Err(CpfError::RepeatedDigits));
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(Cpf::parse("5299822472"), Err(CpfError::WrongLength(10)));
        assert_eq!(Cpf::parse("529982247250"), Err(CpfError::WrongLength(12)));
        assert_eq!(Cpf::parse(""), Err(CpfError::WrongLength(0)));
    }

    #[test]
    fn test_any_single_digit_flip_fails() {
        for cpf in ["52998224725", "11144477735", "86288366757"] {
            let digits: Vec<u8> = cpf.bytes().collect();
            for pos in 0..CPF_LENGTH {
                for replacement in b'0'..=b'9' {
                    if replacement == digits[pos] {
                        continue;
                    }
                    let mut mutated = digits.clone();
                    mutated[pos] = replacement;
                    let mutated = String::from_utf8(mutated).unwrap();
                    assert!(!validate_cpf(&mutated), "{} should be invalid", mutated);
                }
            }
        }
    }

    #[test]
    fn test_folding_can_hide_a_first_digit_flip() {
        // Remainders 0 and 10 both fold to 0, so a flip in the first position can survive
        assert!(validate_cpf("39053344705"));
        assert!(validate_cpf("49053344705"));
    }

    #[test]
    fn test_check_digit_folding() {
        // 1 * 10 = 10 -> 100 % 11 = 1
        assert_eq!(check_digit(&[1, 0, 0, 0, 0, 0, 0, 0, 0]), 1);
        // 6 * 2 = 12 -> 120 % 11 = 10 -> 0
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 6]), 0);
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 1]), 9);
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7]), 2);
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7, 2]), 5);
    }

    #[test]
    fn test_serde_round_trip_rejects_invalid() {
        let cpf: Cpf = serde_json::from_str("\"529.982.247-25\"").unwrap();
        assert_eq!(serde_json::to_string(&cpf).unwrap(), "\"52998224725\"");
        assert!(serde_json::from_str::<Cpf>("\"52998224726\"").is_err());
    }
}
