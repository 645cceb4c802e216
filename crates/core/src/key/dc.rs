//! Stores an entry in the remote document change log
use crate::err::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd)]
#[non_exhaustive]
pub struct Dc {
	pub dc: u64,
}

pub fn new(dc: u64) -> Dc {
	Dc::new(dc)
}

pub fn prefix() -> Vec<u8> {
	b"/!dc\x00".to_vec()
}

/// Returns a range end which includes every change entry up to and
/// including the given change id.
pub fn suffix(dc: u64) -> Vec<u8> {
	let mut k = Dc::new(dc).encode();
	k.extend_from_slice(b"\x00");
	k
}

impl Dc {
	pub fn new(dc: u64) -> Self {
		Self {
			dc,
		}
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut k = b"/!dc".to_vec();
		k.extend_from_slice(&self.dc.to_be_bytes());
		k
	}

	pub fn decode(key: &[u8]) -> Result<Self, Error> {
		let id = key
			.strip_prefix(b"/!dc".as_slice())
			.and_then(|v| <[u8; 8]>::try_from(v).ok())
			.ok_or_else(|| Error::Encoding(format!("Invalid change key: {}", super::debug::sprint(&key))))?;
		Ok(Self {
			dc: u64::from_be_bytes(id),
		})
	}
}

#[cfg(test)]
mod tests {
	#[test]
	fn key() {
		use super::*;
		let val = Dc::new(7);
		let enc = val.encode();
		let dec = Dc::decode(&enc).unwrap();
		assert_eq!(val, dec);
	}

	#[test]
	fn test_prefix() {
		let val = super::prefix();
		assert_eq!(val, b"/!dc\0");
	}

	#[test]
	fn test_suffix() {
		let val = super::suffix(1);
		assert_eq!(val, b"/!dc\x00\x00\x00\x00\x00\x00\x00\x01\x00");
	}

	#[test]
	fn ordering_follows_change_id() {
		use super::*;
		assert!(Dc::new(1).encode() < Dc::new(2).encode());
		assert!(Dc::new(255).encode() < Dc::new(256).encode());
	}
}
