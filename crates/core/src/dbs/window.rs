use std::sync::{Arc, Mutex, MutexGuard};

/// A callback fired when the hosting surface changes visibility.
pub type VisibilityListener = Box<dyn Fn(bool) + Send + Sync + 'static>;

/// A callback fired when the hosting process is about to terminate.
pub type UnloadListener = Box<dyn Fn() + Send + Sync + 'static>;

/// Identifies an attached listener so it can be detached later.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ListenerId(u64);

/// The surface hosting a client, as a source of visibility and unload
/// events.
///
/// Browser embeddings adapt the DOM window; [`ManualWindow`] serves hosts
/// without such events, and tests. Attached listeners are scoped
/// resources: every registration is detached again on every shutdown
/// path, including startup failure.
pub trait Window: Send + Sync + 'static {
	/// Attach a listener for foreground / background transitions.
	fn on_visibility_changed(&self, listener: VisibilityListener) -> ListenerId;
	/// Attach a listener for imminent process termination.
	fn on_unload(&self, listener: UnloadListener) -> ListenerId;
	/// Detach a previously attached listener.
	fn detach(&self, id: ListenerId);
}

#[derive(Default)]
struct Listeners {
	next_id: u64,
	visibility: Vec<(ListenerId, VisibilityListener)>,
	unload: Vec<(ListenerId, UnloadListener)>,
}

/// A [`Window`] driven by explicit host calls.
///
/// Hosts invoke [`ManualWindow::set_visibility`] and
/// [`ManualWindow::unload`]; both dispatch synchronously to every attached
/// listener.
#[derive(Default)]
#[non_exhaustive]
pub struct ManualWindow {
	listeners: Mutex<Listeners>,
}

impl ManualWindow {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	fn listeners(&self) -> MutexGuard<'_, Listeners> {
		match self.listeners.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	/// Report a visibility transition to every attached listener.
	pub fn set_visibility(&self, in_foreground: bool) {
		for (_, listener) in self.listeners().visibility.iter() {
			listener(in_foreground);
		}
	}

	/// Report imminent termination to every attached listener.
	pub fn unload(&self) {
		for (_, listener) in self.listeners().unload.iter() {
			listener();
		}
	}

	/// The number of currently attached listeners.
	pub fn attached(&self) -> usize {
		let listeners = self.listeners();
		listeners.visibility.len() + listeners.unload.len()
	}
}

impl Window for ManualWindow {
	fn on_visibility_changed(&self, listener: VisibilityListener) -> ListenerId {
		let mut listeners = self.listeners();
		listeners.next_id += 1;
		let id = ListenerId(listeners.next_id);
		listeners.visibility.push((id, listener));
		id
	}

	fn on_unload(&self, listener: UnloadListener) -> ListenerId {
		let mut listeners = self.listeners();
		listeners.next_id += 1;
		let id = ListenerId(listeners.next_id);
		listeners.unload.push((id, listener));
		id
	}

	fn detach(&self, id: ListenerId) {
		let mut listeners = self.listeners();
		listeners.visibility.retain(|(lid, _)| *lid != id);
		listeners.unload.retain(|(lid, _)| *lid != id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn listeners_receive_events_until_detached() {
		let window = ManualWindow::new();
		let count = Arc::new(AtomicUsize::new(0));
		let counter = count.clone();
		let id = window.on_visibility_changed(Box::new(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		}));
		window.set_visibility(false);
		window.set_visibility(true);
		assert_eq!(count.load(Ordering::SeqCst), 2);
		window.detach(id);
		window.set_visibility(false);
		assert_eq!(count.load(Ordering::SeqCst), 2);
		assert_eq!(window.attached(), 0);
	}

	#[test]
	fn unload_listeners_fire_synchronously() {
		let window = ManualWindow::new();
		let count = Arc::new(AtomicUsize::new(0));
		let counter = count.clone();
		window.on_unload(Box::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}));
		window.unload();
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}
}
