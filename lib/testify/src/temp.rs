use std::path::PathBuf;

use rand::Rng;
use rand::distr::Alphanumeric;

pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
}

/// A path under the system temp directory which does not exist yet.
pub fn temp_file() -> PathBuf {
    std::env::temp_dir().join(random_string(16))
}

/// Create an empty directory under the system temp directory.
pub fn temp_dir() -> PathBuf {
    let path = temp_file();
    std::fs::create_dir_all(&path).expect("create temp dir");
    path
}
