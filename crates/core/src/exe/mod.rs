//! Executor helpers for spawning background work on native and wasm targets.

use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use tokio::time::sleep;
#[cfg(target_arch = "wasm32")]
pub(crate) use wasmtimer::tokio::sleep;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn<F>(future: F)
where
	F: Future<Output = ()> + Send + 'static,
{
	tokio::spawn(future);
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn<F>(future: F)
where
	F: Future<Output = ()> + 'static,
{
	wasm_bindgen_futures::spawn_local(future);
}
