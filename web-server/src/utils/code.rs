// web-server/src/utils/code.rs
use rand::{thread_rng, Rng};

/// Number of digits in a login verification code
pub const CODE_LENGTH: usize = 6;

/// Generate a uniformly random 6-digit numeric verification code
pub fn generate_verification_code() -> String {
    thread_rng().gen_range(100_000..1_000_000u32).to_string()
}
