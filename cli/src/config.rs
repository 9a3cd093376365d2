use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "NOURISH_DATA_DIR";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory (`NOURISH_DATA_DIR` wins over the platform default).
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "nourish")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::at(&data_dir)
    }

    pub fn at(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Config {
            db_path: data_dir.join("nourish.db"),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Load the token signing secret from disk, or generate a new one.
    ///
    /// Replacing this file invalidates every token issued so far.
    pub fn load_or_create_token_secret(&self) -> Result<Vec<u8>> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("token_secret");

        if path.exists() {
            let secret =
                std::fs::read_to_string(&path).context("Failed to read token secret file")?;
            let secret = secret.trim();
            if secret.len() >= 32 {
                return Ok(secret.as_bytes().to_vec());
            }
            if !secret.is_empty() {
                bail!(
                    "Token secret in {} is too short; delete it to generate a new one",
                    path.display()
                );
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let secret = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        if path.exists() {
            // Only an empty file reaches this point.
            std::fs::remove_file(&path).context("Failed to replace empty token secret file")?;
        }
        write_secret_file(&path, &secret)?;
        tracing::info!(path = %path.display(), "generated new token secret");
        Ok(secret.into_bytes())
    }
}

/// Create the secret file readable by the owner only.
fn write_secret_file(path: &Path, secret: &str) -> Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create token secret file {}", path.display()))?;
    file.write_all(secret.as_bytes())
        .context("Failed to write token secret file")?;
    Ok(())
}
