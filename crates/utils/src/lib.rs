use rand::Rng;

/// Generates a random alphanumeric secret of the given length.
pub fn create_random_secret(secret_len: usize) -> String {
    let rng = rand::thread_rng();
    rng.sample_iter(&rand::distributions::Alphanumeric)
        .take(secret_len)
        .map(char::from)
        .collect()
}
