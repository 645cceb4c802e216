//! Stores a staged mutation batch awaiting the primary client
use crate::err::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd)]
#[non_exhaustive]
pub struct Mb {
	pub mb: u64,
}

pub fn new(mb: u64) -> Mb {
	Mb::new(mb)
}

pub fn prefix() -> Vec<u8> {
	b"/!mb\x00".to_vec()
}

/// Returns a range end which includes every batch up to and including the
/// given batch id.
pub fn suffix(mb: u64) -> Vec<u8> {
	let mut k = Mb::new(mb).encode();
	k.extend_from_slice(b"\x00");
	k
}

impl Mb {
	pub fn new(mb: u64) -> Self {
		Self {
			mb,
		}
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut k = b"/!mb".to_vec();
		k.extend_from_slice(&self.mb.to_be_bytes());
		k
	}

	pub fn decode(key: &[u8]) -> Result<Self, Error> {
		let id = key
			.strip_prefix(b"/!mb".as_slice())
			.and_then(|v| <[u8; 8]>::try_from(v).ok())
			.ok_or_else(|| Error::Encoding(format!("Invalid batch key: {}", super::debug::sprint(&key))))?;
		Ok(Self {
			mb: u64::from_be_bytes(id),
		})
	}
}
