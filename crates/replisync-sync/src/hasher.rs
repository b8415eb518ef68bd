//! Streaming content digests for change detection

use replisync_types::{ChunkSize, Digest, Error, HashAlgorithm, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

/// Computes content digests by streaming files in fixed-size chunks.
///
/// Digests are never cached: every comparison re-reads both files so that
/// changes made between runs are always picked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    chunk_size: ChunkSize,
}

enum Accumulator {
    Blake3(Box<blake3::Hasher>),
    Xxh3(Box<Xxh3>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Xxh3 => Self::Xxh3(Box::new(Xxh3::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(hasher) => {
                hasher.update(data);
            }
            Self::Xxh3(hasher) => hasher.update(data),
        }
    }

    fn finish(self) -> Digest {
        match self {
            Self::Blake3(hasher) => Digest::new(
                HashAlgorithm::Blake3,
                hasher.finalize().as_bytes().to_vec(),
            ),
            Self::Xxh3(hasher) => Digest::new(
                HashAlgorithm::Xxh3,
                hasher.digest128().to_be_bytes().to_vec(),
            ),
        }
    }
}

impl ContentHasher {
    /// Create a hasher with the given algorithm and read size
    pub fn new(algorithm: HashAlgorithm, chunk_size: ChunkSize) -> Self {
        Self {
            algorithm,
            chunk_size,
        }
    }

    /// Algorithm used by this hasher
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest the contents of the file at `path`
    pub async fn digest<P: AsRef<Path>>(&self, path: P) -> Result<Digest> {
        let path = path.as_ref();
        let mut file = File::open(path).await.map_err(|e| Error::io_at(path, e))?;

        let mut buffer = vec![0u8; self.chunk_size.get()];
        let mut accumulator = Accumulator::new(self.algorithm);
        let mut total = 0u64;

        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_at(path, e))?;
            if read == 0 {
                break;
            }
            accumulator.update(&buffer[..read]);
            total += read as u64;
        }

        let digest = accumulator.finish();
        trace!("Digested {} ({} bytes): {}", path.display(), total, digest);
        Ok(digest)
    }

    /// Digest an in-memory buffer
    pub fn digest_bytes(&self, data: &[u8]) -> Digest {
        let mut accumulator = Accumulator::new(self.algorithm);
        for chunk in data.chunks(self.chunk_size.get()) {
            accumulator.update(chunk);
        }
        accumulator.finish()
    }

    /// Whether two files hold byte-identical content, judged by digest
    pub async fn same_content<A, B>(&self, a: A, b: B) -> Result<bool>
    where
        A: AsRef<Path>,
        B: AsRef<Path>,
    {
        let left = self.digest(a).await?;
        let right = self.digest(b).await?;
        Ok(left == right)
    }
}
