use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::interfaces::{ValidationOutcome, Validator};
use crate::name::VersionedName;
use crate::segment::{Segment, SegmentNumber};

/// How the orchestrator reacts to a segment that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Drop the segment and keep running; a valid copy may still arrive.
    #[default]
    Lenient,
    /// Terminate the run on the first rejected segment.
    Strict,
}

impl ValidationPolicy {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            ValidationPolicy::Strict
        } else {
            ValidationPolicy::Lenient
        }
    }
}

/// Accepts every segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl Validator for AcceptAllValidator {
    fn validate(&self, _name: &VersionedName, _segment: &Segment) -> ValidationOutcome {
        ValidationOutcome::Accepted
    }
}

/// Accepts a segment only if its signature is the SHA-256 digest binding the payload to the
/// versioned name, the segment's sequence number and its final-segment marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestValidator;

impl DigestValidator {
    /// Produces the signature a publisher attaches to a segment.
    pub fn sign(
        name: &VersionedName,
        number: SegmentNumber,
        final_segment: Option<SegmentNumber>,
        payload: &[u8],
    ) -> Bytes {
        let mut hasher = Sha256::new();
        hasher.update(name.to_string().as_bytes());
        hasher.update(number.to_be_bytes());
        match final_segment {
            Some(final_segment) => {
                hasher.update([1u8]);
                hasher.update(final_segment.to_be_bytes());
            },
            None => hasher.update([0u8]),
        }
        hasher.update(payload);
        Bytes::copy_from_slice(hasher.finalize().as_slice())
    }
}

impl Validator for DigestValidator {
    fn validate(&self, name: &VersionedName, segment: &Segment) -> ValidationOutcome {
        if segment.signature().is_empty() {
            return ValidationOutcome::Rejected("segment carries no signature".to_string());
        }

        let expected = Self::sign(name, segment.number(), segment.final_segment(), segment.payload());
        if &expected == segment.signature() {
            ValidationOutcome::Accepted
        } else {
            ValidationOutcome::Rejected("digest mismatch".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> VersionedName {
        "/example/object/v=3".parse().unwrap()
    }

    #[test]
    fn test_digest_validator_accepts_signed_segment() {
        let sig = DigestValidator::sign(&name(), 4, None, b"payload");
        let segment = Segment::new(4, "payload").with_signature(sig);

        assert_eq!(DigestValidator.validate(&name(), &segment), ValidationOutcome::Accepted);
    }

    #[test]
    fn test_digest_validator_binds_sequence_number_and_name() {
        let sig = DigestValidator::sign(&name(), 4, None, b"payload");

        let moved = Segment::new(5, "payload").with_signature(sig.clone());
        assert!(!DigestValidator.validate(&name(), &moved).is_accepted());

        let other_version: VersionedName = "/example/object/v=4".parse().unwrap();
        let segment = Segment::new(4, "payload").with_signature(sig);
        assert!(!DigestValidator.validate(&other_version, &segment).is_accepted());
    }

    #[test]
    fn test_digest_validator_rejects_unsigned_or_tampered() {
        let unsigned = Segment::new(0, "AB");
        assert_eq!(
            DigestValidator.validate(&name(), &unsigned),
            ValidationOutcome::Rejected("segment carries no signature".to_string())
        );

        let sig = DigestValidator::sign(&name(), 0, None, b"AB");
        let tampered = Segment::new(0, "AX").with_signature(sig);
        assert_eq!(DigestValidator.validate(&name(), &tampered), ValidationOutcome::Rejected("digest mismatch".to_string()));
    }

    #[test]
    fn test_digest_validator_binds_final_marker() {
        let sig = DigestValidator::sign(&name(), 1, Some(3), b"CD");
        let genuine = Segment::new(1, "CD").with_final_segment(3).with_signature(sig.clone());
        assert!(DigestValidator.validate(&name(), &genuine).is_accepted());

        let forged = Segment::new(1, "CD").with_final_segment(1).with_signature(sig.clone());
        assert_eq!(DigestValidator.validate(&name(), &forged), ValidationOutcome::Rejected("digest mismatch".to_string()));

        let stripped = Segment::new(1, "CD").with_signature(sig);
        assert!(!DigestValidator.validate(&name(), &stripped).is_accepted());
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(ValidationPolicy::from_strict_flag(true), ValidationPolicy::Strict);
        assert_eq!(ValidationPolicy::from_strict_flag(false), ValidationPolicy::Lenient);
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::Lenient);
    }
}
