use mcps_types::Tags;

/// Domain-separated BLAKE3 hasher for ledger uploads.
///
/// Each hasher carries a domain tag that is prepended to every computation, so
/// an upload digest can never collide with a transaction id derived from the
/// same bytes. Variable-length fields are length-prefixed.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Digest signed by the wallet when uploading.
    pub const UPLOAD: Self = Self {
        domain: "mcps-upload-v1",
    };
    /// Content-derived transaction ids issued by the in-memory ledger.
    pub const TRANSACTION: Self = Self {
        domain: "mcps-transaction-v1",
    };

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = self.start();
        update_field(&mut hasher, data);
        *hasher.finalize().as_bytes()
    }

    /// Hash an upload: owner, every tag, then the payload.
    pub fn hash_upload(&self, owner: &str, tags: &Tags, data: &[u8]) -> [u8; 32] {
        let mut hasher = self.start();
        update_field(&mut hasher, owner.as_bytes());
        hasher.update(&(tags.len() as u64).to_le_bytes());
        for tag in tags {
            update_field(&mut hasher, tag.name.as_bytes());
            update_field(&mut hasher, tag.value.as_bytes());
        }
        update_field(&mut hasher, data);
        *hasher.finalize().as_bytes()
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

fn update_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
