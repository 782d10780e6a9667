use std::path::{Path, PathBuf};

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, DemuxError>;

/// Everything that can abort a demultiplexing run.
///
/// Per-record conditions (a read matching no barcode, a discarded trailing
/// partial record) are not errors; they only show up in the run statistics.
#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    /// A barcode line did not split into 2 or 3 tab-separated fields
    #[error(
        "Malformed barcode file '{}' at line {line}: expected 2 or 3 tab-separated fields, found {fields}",
        .path.display()
    )]
    MalformedBarcodeFile {
        path: PathBuf,
        line: usize,
        fields: usize,
    },

    /// The output directory is missing
    #[error("Output directory '{}' does not exist", .0.display())]
    MissingOutputDirectory(PathBuf),

    /// I/O failure with the file and operation that caused it
    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The input ended in the middle of a record
    #[error(
        "Corrupt record #{record} in '{}': input ended after {lines} of 4 lines",
        .path.display()
    )]
    CorruptRecord {
        path: PathBuf,
        record: u64,
        lines: usize,
    },

    /// Neither one nor two input files were given
    #[error("Expected one (single-end) or two comma-separated (paired-end) input files, got {0}")]
    InputCount(usize),
}

impl DemuxError {
    pub(crate) fn io(path: &Path, operation: &'static str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_keeps_source() {
        let err = DemuxError::io(
            Path::new("reads.fq"),
            "open",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "I/O error during open on 'reads.fq': gone"
        );
    }

    #[test]
    fn test_malformed_message_names_line() {
        let err = DemuxError::MalformedBarcodeFile {
            path: PathBuf::from("bar.txt"),
            line: 3,
            fields: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("bar.txt"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("found 4"));
    }
}
