//! Helpers for rendering keys in logs.

/// Converts a key to an escaped string for trace output. Not for use in
/// key handling code.
pub fn sprint<T>(key: &T) -> String
where
	T: AsRef<[u8]>,
{
	key.as_ref()
		.iter()
		.flat_map(|&byte| std::ascii::escape_default(byte))
		.map(|byte| byte as char)
		.collect::<String>()
}
