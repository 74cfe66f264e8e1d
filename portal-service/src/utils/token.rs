use rand::Rng;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LENGTH: usize = 26;

/// Generate a single-use invitation token.
///
/// 26 characters sampled from the base-36 alphabet with the thread-local
/// CSPRNG, roughly 134 bits of entropy.
pub fn generate_invitation_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
