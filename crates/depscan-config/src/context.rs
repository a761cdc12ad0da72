//! Scanning context hashes.
//!
//! Two scans may share cached records only when every setting that affects
//! module discovery agrees. The context hash fingerprints those settings.

use crate::config::ScanConfig;

/// Bumped when the set of hashed inputs changes.
const CONTEXT_HASH_VERSION: u32 = 1;

/// Length of the hex digest prefix used as the hash.
const CONTEXT_HASH_LEN: usize = 16;

impl ScanConfig {
    /// Fingerprint of the discovery-relevant settings.
    ///
    /// Worker count, logging and CAS settings do not change which modules are
    /// found and are left out.
    pub fn context_hash(&self) -> String {
        let mut inputs: Vec<String> = vec![
            format!("triple={}", self.target.triple),
            format!(
                "clang-target={}",
                self.target.clang_target.as_deref().unwrap_or("")
            ),
            format!("objc={}", self.language.objc_interop),
            format!("cxx={}", self.language.cxx_interop),
            format!("embedded={}", self.language.embedded),
            format!("apinotes={}", self.language.apinotes_version),
            format!("module-output={}", self.module_output_path),
        ];
        inputs.extend(self.search.clang_args.iter().map(|arg| format!("clang-arg={arg}")));
        inputs.extend(self.search.vfs_overlays.iter().map(|overlay| format!("vfs={overlay}")));

        hash_inputs(&inputs)
    }
}

/// Hash an ordered list of inputs into a context hash.
pub fn hash_inputs<S: AsRef<str>>(inputs: &[S]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&CONTEXT_HASH_VERSION.to_le_bytes());
    for input in inputs {
        hasher.update(input.as_ref().as_bytes());
        hasher.update(b"\0");
    }
    let mut hex = hasher.finalize().to_hex().to_string();
    hex.truncate(CONTEXT_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_short() {
        let config = ScanConfig::default();
        assert_eq!(config.context_hash(), config.context_hash());
        assert_eq!(config.context_hash().len(), CONTEXT_HASH_LEN);
    }

    #[test]
    fn discovery_settings_change_the_hash() {
        let base = ScanConfig::default();
        let mut cxx = base.clone();
        cxx.language.cxx_interop = true;
        let mut triple = base.clone();
        triple.target.triple = "arm64-apple-macosx14.0".into();

        assert_ne!(base.context_hash(), cxx.context_hash());
        assert_ne!(base.context_hash(), triple.context_hash());
    }

    #[test]
    fn worker_count_does_not_change_the_hash() {
        let base = ScanConfig::default();
        let serial = ScanConfig {
            parallel: false,
            ..base.clone()
        };
        assert_eq!(base.context_hash(), serial.context_hash());
    }
}
