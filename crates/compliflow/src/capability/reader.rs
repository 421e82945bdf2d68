use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::capability::DocumentReader;
use crate::error::CapabilityError;

/// Reads documents from the local filesystem, refusing anything larger
/// than `max_bytes`.
pub struct FsDocumentReader {
    max_bytes: u64,
}

impl FsDocumentReader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl DocumentReader for FsDocumentReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>, CapabilityError> {
        let read_error = |e| CapabilityError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        };

        let file = File::open(path).map_err(read_error)?;
        let too_large = |size: u64| CapabilityError::DocumentTooLarge {
            size,
            limit: self.max_bytes,
        };

        let size = file.metadata().map_err(read_error)?.len();
        if size > self.max_bytes {
            return Err(too_large(size));
        }

        // The file may still grow after the metadata check.
        match read_limited(file, self.max_bytes).map_err(read_error)? {
            Some(bytes) => Ok(bytes),
            None => Err(too_large(self.max_bytes.saturating_add(1))),
        }
    }
}

/// Reads at most `limit` bytes. `None` when the source holds more.
fn read_limited(reader: impl Read, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(bytes))
}
