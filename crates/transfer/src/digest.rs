use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest as _, Sha256};

use crate::{COPY_BUFFER_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Algorithm selection
// ---------------------------------------------------------------------------

/// Digest algorithms accepted for integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Md5,
}

impl DigestAlgorithm {
    /// Canonical configuration name (`SHA-256` or `MD5`).
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Md5 => "MD5",
        }
    }

    /// Length in bytes of digests produced by this algorithm.
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Md5 => 16,
        }
    }

    /// Creates an empty accumulator for this algorithm.
    pub fn digester(self) -> Digester {
        Digester::new(self)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA-256" | "SHA256" => Ok(DigestAlgorithm::Sha256),
            "MD5" => Ok(DigestAlgorithm::Md5),
            _ => Err(TransferError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Digest value
// ---------------------------------------------------------------------------

/// A finished digest. Two digests are equal iff every byte matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Running digest over bytes fed in arbitrary-sized pieces.
#[derive(Clone)]
pub struct Digester {
    state: State,
}

#[derive(Clone)]
enum State {
    Sha256(Sha256),
    Md5(Md5),
}

impl Digester {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha256 => State::Sha256(Sha256::new()),
            DigestAlgorithm::Md5 => State::Md5(Md5::new()),
        };
        Self { state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Sha256(h) => h.update(data),
            State::Md5(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Digest {
        match self.state {
            State::Sha256(h) => Digest(h.finalize().to_vec()),
            State::Md5(h) => Digest(h.finalize().to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream wrappers
// ---------------------------------------------------------------------------

/// Wraps a reader and digests every byte read through it.
pub struct DigestReader<R> {
    inner: R,
    digester: Digester,
    bytes: u64,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R, algorithm: DigestAlgorithm) -> Self {
        Self {
            inner,
            digester: Digester::new(algorithm),
            bytes: 0,
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Consumes the wrapper, returning the digest of everything read.
    pub fn finish(self) -> Digest {
        self.digester.finalize()
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.digester.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}

/// Wraps a writer and digests every byte accepted by it.
pub struct DigestWriter<W> {
    inner: W,
    digester: Digester,
    bytes: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W, algorithm: DigestAlgorithm) -> Self {
        Self {
            inner,
            digester: Digester::new(algorithm),
            bytes: 0,
        }
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Flushes and consumes the wrapper, returning the digest and the inner writer.
    pub fn finish(mut self) -> io::Result<(Digest, W)> {
        self.inner.flush()?;
        Ok((self.digester.finalize(), self.inner))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digester.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Copies `reader` into `writer` in chunks while digesting the bytes read.
///
/// Copying and digesting happen in a single pass. If `chunk_size` is 0,
/// [`COPY_BUFFER_SIZE`] is used. Returns the digest and the byte count.
pub fn copy_with_digest<R: Read, W: Write + ?Sized>(
    reader: R,
    writer: &mut W,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
) -> io::Result<(Digest, u64)> {
    let chunk_size = if chunk_size == 0 {
        COPY_BUFFER_SIZE
    } else {
        chunk_size
    };
    let mut source = DigestReader::new(reader, algorithm);
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
    }
    writer.flush()?;
    let bytes = source.bytes_read();
    Ok((source.finish(), bytes))
}

/// Digests everything readable from `reader`.
pub fn digest_reader<R: Read>(reader: R, algorithm: DigestAlgorithm) -> io::Result<Digest> {
    let (digest, _) = copy_with_digest(reader, &mut io::sink(), algorithm, 0)?;
    Ok(digest)
}

/// Digests an entire local file.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<Digest, TransferError> {
    let file = std::fs::File::open(path).map_err(|e| TransferError::io(path.display(), e))?;
    digest_reader(file, algorithm).map_err(|e| TransferError::io(path.display(), e))
}

/// Digests an in-memory buffer.
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> Digest {
    let mut digester = Digester::new(algorithm);
    digester.update(data);
    digester.finalize()
}
