use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    // Brazilian mobile in E.164: +55, two-digit area code, nine-digit subscriber number
    static ref MOBILE_PHONE_REGEX: Regex = Regex::new(r"^\+55[0-9]{11}$").unwrap();

    static ref OTP_CODE_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

/// Returns true if `phone` is a national mobile number in strict E.164 form.
pub fn is_valid_mobile_phone(phone: &str) -> bool {
    MOBILE_PHONE_REGEX.is_match(phone)
}

/// Returns true if `code` is exactly six ASCII digits.
pub fn is_well_formed_code(code: &str) -> bool {
    OTP_CODE_REGEX.is_match(code)
}

/// Hash a phone number using SHA256.
///
/// Used for store keys and log fields so raw numbers never leave the request path.
pub fn hash_phone_number(phone_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    format!("{:x}", hasher.finalize())
}
