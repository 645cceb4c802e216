//! Stores the metadata record for a single database client
use crate::err::Error;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd)]
#[non_exhaustive]
pub struct Cl {
	pub cl: Uuid,
}

pub fn new(cl: Uuid) -> Cl {
	Cl::new(cl)
}

pub fn prefix() -> Vec<u8> {
	b"/!cl\x00".to_vec()
}

pub fn suffix() -> Vec<u8> {
	let mut k = b"/!cl".to_vec();
	k.extend_from_slice(&[0xff; 16]);
	k.extend_from_slice(b"\x00");
	k
}

impl Cl {
	pub fn new(cl: Uuid) -> Self {
		Self {
			cl,
		}
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut k = b"/!cl".to_vec();
		k.extend_from_slice(self.cl.as_bytes());
		k
	}

	pub fn decode(key: &[u8]) -> Result<Self, Error> {
		let id = key
			.strip_prefix(b"/!cl".as_slice())
			.ok_or_else(|| Error::Encoding(format!("Invalid client key: {}", super::debug::sprint(&key))))?;
		Ok(Self {
			cl: Uuid::from_slice(id)
				.map_err(|_| Error::Encoding(format!("Invalid client key: {}", super::debug::sprint(&key))))?,
		})
	}
}
