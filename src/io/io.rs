use crate::error::{DemuxError, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, ErrorKind, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open an input stream, transparently decompressing gzip.
///
/// Compression is detected from the magic bytes rather than the extension, so
/// `reads.fq` that is really gzipped (or `reads.fq.gz` that is not) both work.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| DemuxError::io(path, "open", e))?;
    sniff_input(file, path)
}

/// Wrap `reader`, decompressing it when it starts with the gzip magic.
///
/// Pipes may hand out a single byte per read, so the magic is collected with
/// repeated reads and put back in front of the stream.
fn sniff_input<R: Read + Send + 'static>(mut reader: R, path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let mut magic = [0u8; GZIP_MAGIC.len()];
    let mut filled = 0;
    while filled < magic.len() {
        match reader.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(DemuxError::io(path, "read", e)),
        }
    }

    let stream = Cursor::new(magic[..filled].to_vec()).chain(reader);
    if magic[..filled] == GZIP_MAGIC {
        log::debug!("{} is gzip compressed", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(stream))))
    } else {
        Ok(Box::new(BufReader::new(stream)))
    }
}

/// Create (or truncate) an output file behind a buffered writer
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| DemuxError::io(path, "create", e))?;
    Ok(BufWriter::new(file))
}
