//! `<stage>.lock.json` records written after each completed stage

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDigest {
    pub file: String,
    pub records: u64,
    pub bytes: u64,
    pub sha256: String,
}

impl OutputDigest {
    pub fn of(path: &Path, records: u64) -> Result<Self> {
        let bytes = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        Ok(Self {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            records,
            bytes,
            sha256: compute_sha256(path)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLock {
    pub stage: String,
    pub step: u32,
    pub outputs: Vec<OutputDigest>,
    /// Stage statistics, including input record counts
    pub summary: serde_json::Value,
    pub elapsed_ms: u64,
    pub created_at_utc: String,
}

impl StageLock {
    pub fn new<S: Serialize>(
        stage: &str,
        step: u32,
        outputs: Vec<OutputDigest>,
        summary: &S,
        elapsed_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            stage: stage.to_string(),
            step,
            outputs,
            summary: serde_json::to_value(summary).context("Failed to serialize stage summary")?,
            elapsed_ms,
            created_at_utc: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn path_in(dir: &Path, stage: &str) -> PathBuf {
        dir.join(format!("{stage}.lock.json"))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)?;
        println!("  ✓ Wrote {}", path.display());
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// Hex SHA-256 of a whole file
pub fn compute_sha256<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open {} for hashing", path.as_ref().display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_sha256_known_value() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        tmp.flush().unwrap();
        assert_eq!(
            compute_sha256(tmp.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_lock_round_trip() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("wayway.dat");
        std::fs::write(&output, b"0123456789").unwrap();

        #[derive(Serialize)]
        struct Stats {
            ways: u64,
        }

        let lock = StageLock::new(
            "wayway",
            1,
            vec![OutputDigest::of(&output, 3).unwrap()],
            &Stats { ways: 3 },
            12,
        )
        .unwrap();
        let path = StageLock::path_in(dir.path(), "wayway");
        lock.write(&path).unwrap();

        let back = StageLock::read(&path).unwrap();
        assert_eq!(back.stage, "wayway");
        assert_eq!(back.outputs[0].file, "wayway.dat");
        assert_eq!(back.outputs[0].bytes, 10);
        assert_eq!(back.summary["ways"], 3);
        assert!(chrono::DateTime::parse_from_rfc3339(&back.created_at_utc).is_ok());
    }
}
