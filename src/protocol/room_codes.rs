use rand::Rng;

/// Room codes are short enough to read out loud on a call.
pub const ROOM_CODE_LENGTH: usize = 4;

const ALPHANUMERIC_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a uniformly random uppercase alphanumeric room code.
/// Uniqueness against live rooms is the registry's job; it retries on
/// collision.
#[must_use]
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ALPHANUMERIC_CHARS.len());
            ALPHANUMERIC_CHARS[idx] as char
        })
        .collect()
}

/// Uppercase and trim a client-supplied code.
#[must_use]
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// A code is valid when it is exactly four uppercase alphanumerics.
#[must_use]
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH
        && code
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}
