use rand::{distributions::Alphanumeric, Rng};

/// Length of every record identifier (checks, tokens).
pub const ID_LENGTH: usize = 20;

/// Generate a random lowercase alphanumeric identifier of the given length.
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}
