//! Encryption key files and file-backed secrets.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{ConvergeError, Result};

/// Read a key file, trimming surrounding whitespace. An empty file is an error.
pub fn read_key(path: &Path) -> Result<String> {
    let key = fs::read_to_string(path)?.trim().to_string();
    if key.is_empty() {
        return Err(ConvergeError::Policy(format!(
            "encryption key file {} is empty",
            path.display()
        )));
    }
    Ok(key)
}

/// A secret given either inline or as the path of a file holding it.
pub fn read_secret(value_or_path: &str) -> Result<String> {
    let path = Path::new(value_or_path);
    if !path.is_file() {
        return Ok(value_or_path.trim().to_string());
    }
    let secret = fs::read_to_string(path)?.trim().to_string();
    if secret.is_empty() {
        return Err(ConvergeError::Policy(format!("secret file {} is empty", path.display())));
    }
    Ok(secret)
}

/// Write `key` plus a newline, creating parent directories. On unix the file
/// is created (or truncated) with mode 0600.
pub fn write_key_safe(path: &Path, key: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(key.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
