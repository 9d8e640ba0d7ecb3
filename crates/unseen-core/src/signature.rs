//! ECDSA recovery over `r || s || v` signatures.

use alloy_primitives::{keccak256, Address, Signature, B256, U256};

/// Length of a plain `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Default prefix for personal-message signing.
pub const PERSONAL_SIGN_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Marker byte appended after the 65 signature bytes to request
/// personal-message recovery.
pub const PERSONAL_SIGN_MARKER: u8 = 0x03;

/// Recovers the signer of `hash` from the first 65 bytes of `signature`.
///
/// Accepts `v` as 27/28 or 0/1. Returns `None` for anything malformed.
pub fn recover(hash: B256, signature: &[u8]) -> Option<Address> {
	let raw = signature.get(..SIGNATURE_LENGTH)?;
	let r = U256::from_be_slice(&raw[..32]);
	let s = U256::from_be_slice(&raw[32..64]);
	let y_parity = match raw[64] {
		0 | 27 => false,
		1 | 28 => true,
		_ => return None,
	};
	Signature::new(r, s, y_parity)
		.recover_address_from_prehash(&hash)
		.ok()
}

/// `keccak256(prefix || "32" || hash)`, the digest a wallet signs when asked
/// to personal-sign a 32-byte hash.
pub fn personal_sign_hash(prefix: &str, hash: B256) -> B256 {
	let mut message = Vec::with_capacity(prefix.len() + 2 + 32);
	message.extend_from_slice(prefix.as_bytes());
	message.extend_from_slice(b"32");
	message.extend_from_slice(hash.as_slice());
	keccak256(message)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	fn signer() -> PrivateKeySigner {
		PrivateKeySigner::from_bytes(&B256::repeat_byte(0x11)).unwrap()
	}

	#[test]
	fn test_recover_typed_hash() {
		let signer = signer();
		let hash = keccak256(b"order");
		let signature = signer.sign_hash_sync(&hash).unwrap();
		assert_eq!(recover(hash, &signature.as_bytes()), Some(signer.address()));
	}

	#[test]
	fn test_personal_sign_hash_matches_eip191() {
		let signer = signer();
		let hash = keccak256(b"order");
		let signature = signer.sign_message_sync(hash.as_slice()).unwrap();
		let digest = personal_sign_hash(PERSONAL_SIGN_PREFIX, hash);
		assert_eq!(recover(digest, &signature.as_bytes()), Some(signer.address()));
	}

	#[test]
	fn test_malformed_signatures() {
		let hash = keccak256(b"order");
		assert_eq!(recover(hash, &[0u8; 64]), None);
		let mut bad_v = [1u8; 65];
		bad_v[64] = 29;
		assert_eq!(recover(hash, &bad_v), None);
	}
}
