//! Stores a cached query target
use crate::err::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd)]
#[non_exhaustive]
pub struct Qt {
	pub qt: u32,
}

pub fn new(qt: u32) -> Qt {
	Qt::new(qt)
}

impl Qt {
	pub fn new(qt: u32) -> Self {
		Self {
			qt,
		}
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut k = b"/!qt".to_vec();
		k.extend_from_slice(&self.qt.to_be_bytes());
		k
	}

	pub fn decode(key: &[u8]) -> Result<Self, Error> {
		let id = key
			.strip_prefix(b"/!qt".as_slice())
			.and_then(|v| <[u8; 4]>::try_from(v).ok())
			.ok_or_else(|| Error::Encoding(format!("Invalid target key: {}", super::debug::sprint(&key))))?;
		Ok(Self {
			qt: u32::from_be_bytes(id),
		})
	}
}
