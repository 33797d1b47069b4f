// auction-core/src/lifecycle.rs

use crate::error::CoreError;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
	Mounted,
	Unmounting,
	Unmounted,
}

impl ViewState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => Self::Mounted,
			1 => Self::Unmounting,
			_ => Self::Unmounted,
		}
	}

	fn as_u8(self) -> u8 {
		match self {
			Self::Mounted => 0,
			Self::Unmounting => 1,
			Self::Unmounted => 2,
		}
	}
}

impl std::fmt::Display for ViewState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Mounted => write!(f, "Mounted"),
			Self::Unmounting => write!(f, "Unmounting"),
			Self::Unmounted => write!(f, "Unmounted"),
		}
	}
}

/// Lifetime of one mounted view (the listing, or one detail page).
///
/// Timers and polling loops started for a view stop when it unmounts, and
/// fetches or submissions it started check [`ViewScope::is_mounted`] before
/// writing anything back. Clones share the same lifetime.
#[derive(Clone)]
pub struct ViewScope {
	inner: Arc<ScopeInner>,
}

struct ScopeInner {
	name: String,
	state: AtomicU8,
	unmount_tx: broadcast::Sender<()>,
}

impl ViewScope {
	pub fn mount(name: impl Into<String>) -> Self {
		let (unmount_tx, _) = broadcast::channel(16);
		let name = name.into();
		debug!("View '{}' mounted", name);

		Self {
			inner: Arc::new(ScopeInner {
				name,
				state: AtomicU8::new(ViewState::Mounted.as_u8()),
				unmount_tx,
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn state(&self) -> ViewState {
		ViewState::from_u8(self.inner.state.load(Ordering::Acquire))
	}

	pub fn is_mounted(&self) -> bool {
		self.state() == ViewState::Mounted
	}

	/// Tears the view down. Tasks listening on the unmount signal stop;
	/// anything still in flight will find the scope unmounted.
	pub fn unmount(&self) -> Result<(), CoreError> {
		self.transition(ViewState::Mounted, ViewState::Unmounting)?;
		let _ = self.inner.unmount_tx.send(());
		self.transition(ViewState::Unmounting, ViewState::Unmounted)?;
		info!("View '{}' unmounted", self.inner.name);
		Ok(())
	}

	pub fn subscribe_unmount(&self) -> broadcast::Receiver<()> {
		self.inner.unmount_tx.subscribe()
	}

	/// Resolves once the view has unmounted.
	pub async fn unmounted(&self) {
		let mut rx = self.subscribe_unmount();
		if !self.is_mounted() {
			return;
		}
		let _ = rx.recv().await;
	}

	/// The error an operation returns when it finishes after unmount.
	pub(crate) fn discarded(&self) -> CoreError {
		debug!("Dropping result for unmounted view '{}'", self.inner.name);
		CoreError::Unmounted(self.inner.name.clone())
	}

	fn transition(&self, from: ViewState, to: ViewState) -> Result<(), CoreError> {
		self.inner
			.state
			.compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
			.map(|_| ())
			.map_err(|actual| {
				CoreError::Lifecycle(format!(
					"Invalid view transition for '{}' from {} to {}",
					self.inner.name,
					ViewState::from_u8(actual),
					to
				))
			})
	}
}

impl std::fmt::Debug for ViewScope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ViewScope")
			.field("name", &self.inner.name)
			.field("state", &self.state())
			.finish()
	}
}
