//! Stores a remote document cache record, keyed by document path
use crate::err::Error;

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd)]
#[non_exhaustive]
pub struct Rd<'a> {
	pub rd: &'a str,
}

pub fn new(rd: &str) -> Rd<'_> {
	Rd::new(rd)
}

impl<'a> Rd<'a> {
	pub fn new(rd: &'a str) -> Self {
		Self {
			rd,
		}
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut k = b"/!rd".to_vec();
		k.extend_from_slice(self.rd.as_bytes());
		k
	}

	pub fn decode(key: &'a [u8]) -> Result<Self, Error> {
		let rd = key
			.strip_prefix(b"/!rd".as_slice())
			.and_then(|v| std::str::from_utf8(v).ok())
			.ok_or_else(|| Error::Encoding(format!("Invalid document key: {}", super::debug::sprint(&key))))?;
		Ok(Self {
			rd,
		})
	}
}
