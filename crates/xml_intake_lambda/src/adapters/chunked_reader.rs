use tokio::io::{AsyncRead, AsyncReadExt};

/// Re-slices an object stream into fixed-size chunks. Every chunk except the
/// last is exactly `chunk_size` bytes; the sequence is finite and cannot be
/// restarted.
pub struct ChunkedObjectReader<R> {
    inner: R,
    chunk_size: usize,
    exhausted: bool,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> ChunkedObjectReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            exhausted: false,
            bytes_read: 0,
        }
    }

    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut chunk = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            let read = self.inner.read(&mut chunk[filled..]).await?;
            if read == 0 {
                self.exhausted = true;
                break;
            }
            filled += read;
        }

        chunk.truncate(filled);
        self.bytes_read += filled as u64;
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
