/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
#[macro_export]
#[doc(hidden)]
macro_rules! lazy_env_parse {
	($key:expr, $t:ty, $default:expr) => {
		once_cell::sync::Lazy::new(|| {
			std::env::var($key)
				.and_then(|s| Ok(s.parse::<$t>().unwrap_or($default)))
				.unwrap_or($default)
		})
	};
}

/// Unwraps the result of an expression, cancelling the transaction and
/// returning early if the expression failed
#[macro_export]
#[doc(hidden)]
macro_rules! catch {
	($txn:ident, $default:expr) => {
		match $default {
			Err(e) => {
				let _ = $txn.cancel().await;
				return Err(e);
			}
			Ok(v) => v,
		}
	};
}

/// Runs the expression, committing the transaction if it succeeded, and
/// cancelling the transaction if it failed
#[macro_export]
#[doc(hidden)]
macro_rules! run {
	($txn:ident, $default:expr) => {
		match $default {
			Err(e) => {
				let _ = $txn.cancel().await;
				Err(e)
			}
			Ok(v) => $txn.commit().await.map(|_| v),
		}
	};
}
