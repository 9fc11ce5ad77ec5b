use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// 32 alphanumeric characters, about 190 bits of entropy.
pub const TOKEN_LEN: usize = 32;

pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
