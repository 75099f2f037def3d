//! Hash-chained audit log helpers
//!
//! Every successful lifecycle transition appends exactly one [`AuditEntry`];
//! each entry's hash covers its predecessor's hash, so the log can only be
//! extended, never rewritten. Entries are persisted through the backend in
//! the same atomic batch as the transition they record.

use age_artifact::{Actor, ArtifactId, AuditEntry, AuditOp, GovernanceError, PayloadHash, Version};
use chrono::Utc;

/// Build the next entry in the chain
///
/// `prev_hash` is the hash of the last committed entry, or
/// [`PayloadHash::zero`] for the first one.
#[must_use]
pub fn next_entry(
    op: AuditOp,
    artifact_id: ArtifactId,
    version: Version,
    actor: Actor,
    resulting_hash: PayloadHash,
    prev_hash: PayloadHash,
) -> AuditEntry {
    let mut entry = AuditEntry {
        op,
        artifact_id,
        version,
        actor,
        timestamp: Utc::now(),
        resulting_hash,
        prev_hash,
        entry_hash: PayloadHash::zero(),
    };
    entry.entry_hash = entry_hash(&entry);
    entry
}

/// Hash of an entry's content, excluding `entry_hash` itself
#[must_use]
pub fn entry_hash(entry: &AuditEntry) -> PayloadHash {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(entry.op.as_str().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(entry.artifact_id.to_string().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&entry.version.0.to_le_bytes());
    bytes.extend_from_slice(entry.actor.to_string().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(entry.timestamp.to_rfc3339().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(entry.resulting_hash.as_bytes());
    bytes.extend_from_slice(entry.prev_hash.as_bytes());
    PayloadHash::compute(&bytes)
}

/// Verify a full chain
///
/// # Errors
/// Returns [`GovernanceError::AuditTrailBroken`] naming the first entry
/// whose link or content hash does not match.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), GovernanceError> {
    let mut prev = PayloadHash::zero();
    for (index, entry) in entries.iter().enumerate() {
        if entry.prev_hash != prev {
            return Err(GovernanceError::AuditTrailBroken(format!(
                "entry {index} ({}) does not chain to its predecessor",
                entry.op.as_str()
            )));
        }
        if entry_hash(entry) != entry.entry_hash {
            return Err(GovernanceError::AuditTrailBroken(format!(
                "entry {index} ({}) content hash mismatch",
                entry.op.as_str()
            )));
        }
        prev = entry.entry_hash;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_chain(len: usize) -> Vec<AuditEntry> {
        let mut entries = Vec::new();
        let mut prev = PayloadHash::zero();
        for i in 0..len {
            let entry = next_entry(
                AuditOp::Register,
                ArtifactId::new(),
                Version::initial(),
                Actor::system("test"),
                PayloadHash::compute(format!("payload-{i}").as_bytes()),
                prev,
            );
            prev = entry.entry_hash;
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn empty_chain_verifies() {
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn well_formed_chain_verifies() {
        let entries = sample_chain(5);
        assert!(verify_chain(&entries).is_ok());
    }

    #[test]
    fn tampered_content_is_detected() {
        let mut entries = sample_chain(3);
        entries[1].resulting_hash = PayloadHash::compute(b"tampered");
        let err = verify_chain(&entries).unwrap_err();
        assert_eq!(err.kind(), "AuditTrailBroken");
    }

    #[test]
    fn broken_link_is_detected() {
        let mut entries = sample_chain(3);
        entries.remove(1);
        let err = verify_chain(&entries).unwrap_err();
        assert!(err.to_string().contains("does not chain"));
    }

    proptest! {
        /// Any prefix of a valid chain is itself a valid chain; any
        /// single-byte corruption of a prev_hash breaks verification.
        #[test]
        fn prefixes_verify_and_corruption_breaks(len in 1usize..8, corrupt in 0usize..8) {
            let entries = sample_chain(len);
            for end in 0..=len {
                prop_assert!(verify_chain(&entries[..end]).is_ok());
            }

            let corrupt = corrupt % len;
            let mut broken = entries;
            let mut bytes = *broken[corrupt].prev_hash.as_bytes();
            bytes[0] ^= 0xFF;
            broken[corrupt].prev_hash = PayloadHash::new(bytes);
            prop_assert!(verify_chain(&broken).is_err());
        }
    }
}
