//! Consolidated integration tests for wfsl-proofgate.
//!
//! See: https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod gate;
mod manifest_verify;

use std::path::PathBuf;

use serde_json::{json, Value};
use wfsl_crypto::{encode_base64, DetachedSigner, Ed25519Signer};

/// A signed artifact laid out next to its manifest in a temp directory.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub signer: Ed25519Signer,
}

impl Fixture {
    pub const MESSAGE: &'static [u8] = b"release-1.2.3.tar.gz contents";

    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
            signer: Ed25519Signer::random(),
        };
        fixture.write("message.bin", Self::MESSAGE);
        fixture
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn signature_b64(&self) -> String {
        encode_base64(self.signer.sign(Self::MESSAGE).unwrap())
    }

    pub fn public_key_b64(&self) -> String {
        encode_base64(self.signer.public_key())
    }

    /// Manifest pointing at files for message, signature and key.
    pub fn file_manifest(&self) -> Value {
        self.write("message.sig", self.signature_b64());
        self.write("wfsl.pub", self.public_key_b64());
        json!({
            "messageFile": "message.bin",
            "signatureFile": "message.sig",
            "publicKeyFile": "wfsl.pub"
        })
    }

    pub fn write_manifest(&self, manifest: &Value) -> PathBuf {
        self.write("manifest.json", manifest.to_string())
    }
}
