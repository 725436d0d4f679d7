//! Atomic persistence: all-or-nothing file writes.
//!
//! Every write goes to a temporary sibling in the destination directory, is
//! synced to disk, then renamed onto the destination. A failure anywhere before
//! the rename removes the temporary file and leaves the destination untouched —
//! never a truncated file.

use crate::audio::wav;
use crate::error::{Result, VoxgateError};
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receipt for a completed atomic write.
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Per-process counter making temp names unique between concurrent writers.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Removes the temp file unless the rename succeeded.
struct TempCleanup<'a> {
    path: &'a Path,
    armed: bool,
}

impl Drop for TempCleanup<'_> {
    fn drop(&mut self) {
        if self.armed && let Err(e) = fs::remove_file(self.path) {
            // Cleanup failure must not mask the original error.
            log::warn!("failed to remove temp file {}: {e}", self.path.display());
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    path.with_file_name(format!("{name}.{pid}.{n}.tmp"))
}

fn write_err(path: &Path, e: impl std::fmt::Display) -> VoxgateError {
    VoxgateError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Atomically writes `bytes` to `path`.
///
/// The temporary file lives in the destination directory so the final rename
/// stays within one filesystem. The last successful rename wins between
/// concurrent writers of the same destination; mutual exclusion, where needed,
/// belongs to the admission layer.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<WriteReceipt> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| write_err(path, e))?;
    }

    let tmp_path = temp_sibling(path);
    let mut cleanup = TempCleanup {
        path: &tmp_path,
        armed: true,
    };

    let mut file = File::create(&tmp_path).map_err(|e| write_err(path, e))?;
    file.write_all(bytes).map_err(|e| write_err(path, e))?;
    // Durably flush before the rename so a crash can't expose an empty rename
    // target.
    file.sync_all().map_err(|e| write_err(path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| write_err(path, e))?;
    cleanup.armed = false;

    Ok(WriteReceipt {
        path: path.to_path_buf(),
        bytes_written: bytes.len() as u64,
    })
}

/// Encodes samples as a 16-bit mono WAV and writes it atomically.
pub fn atomic_write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<WriteReceipt> {
    let bytes = wav::encode_wav_mono16(samples, sample_rate)?;
    atomic_write(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_creates_complete_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");

        let receipt = atomic_write(&dest, b"hello world").unwrap();
        assert_eq!(receipt.bytes_written, 11);
        assert_eq!(fs::read(&dest).unwrap(), b"hello world");
    }

    #[test]
    fn write_creates_missing_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a").join("b").join("out.bin");

        atomic_write(&dest, b"nested").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"nested");
    }

    #[test]
    fn write_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");

        atomic_write(&dest, b"first").unwrap();
        atomic_write(&dest, b"second").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"second");
    }

    #[test]
    fn no_temp_files_left_after_success() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");

        atomic_write(&dest, b"data").unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[test]
    fn failed_write_leaves_prior_content_and_no_temp() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        atomic_write(&dest, b"original").unwrap();

        // A destination whose parent is a regular file forces create_dir_all
        // (and everything after) to fail before any rename.
        let blocked = dest.join("child.bin");
        let result = atomic_write(&blocked, b"new");
        assert!(matches!(result, Err(VoxgateError::Write { .. })));

        assert_eq!(fs::read(&dest).unwrap(), b"original");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn concurrent_writers_each_produce_complete_content() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");

        let mut handles = Vec::new();
        for i in 0..4u8 {
            let dest = dest.clone();
            handles.push(std::thread::spawn(move || {
                let payload = vec![i; 4096];
                atomic_write(&dest, &payload).unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // Last rename wins; whatever is there must be one writer's complete
        // payload, never an interleaving.
        let content = fs::read(&dest).unwrap();
        assert_eq!(content.len(), 4096);
        assert!(content.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn atomic_write_wav_produces_parseable_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..2400)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();

        let receipt = atomic_write_wav(&dest, &samples, 24000).unwrap();
        assert!(receipt.bytes_written > 44); // header + data

        let reader = hound::WavReader::open(&dest).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(reader.len(), 2400);
    }
}
