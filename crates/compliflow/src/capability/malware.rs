//! Byte-signature malware scanner.

use tracing::debug;

use crate::capability::{MalwareScanner, ScanVerdict};
use crate::config::SignatureConfig;
use crate::error::CapabilityError;

struct Signature {
    name: String,
    bytes: Vec<u8>,
}

pub struct SignatureScanner {
    signatures: Vec<Signature>,
}

impl SignatureScanner {
    pub fn new(signatures: &[SignatureConfig]) -> Self {
        let signatures = signatures
            .iter()
            .filter(|s| !s.pattern.is_empty())
            .map(|s| Signature {
                name: s.name.clone(),
                bytes: s.pattern.as_bytes().to_vec(),
            })
            .collect();
        Self { signatures }
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

impl MalwareScanner for SignatureScanner {
    fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict, CapabilityError> {
        for signature in &self.signatures {
            if contains(bytes, &signature.bytes) {
                debug!(signature = %signature.name, "Signature matched");
                return Ok(ScanVerdict::infected(signature.name.clone()));
            }
        }
        Ok(ScanVerdict::clean())
    }
}
