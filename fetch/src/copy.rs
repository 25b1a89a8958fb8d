use std::io::{self, Read, Write};

use extload_core::Deadline;

const CHUNK_SIZE: usize = 64 * 1024;

/// Copies `reader` into `writer` in chunks, passing each chunk to `inspect`
/// and checking `deadline` between chunks.
///
/// Expiry is reported as an [`io::ErrorKind::TimedOut`] error.
pub(crate) fn copy_with_deadline<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    deadline: &Deadline,
    mut inspect: impl FnMut(&[u8]),
) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        if deadline.is_expired() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded"));
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        inspect(&buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}
