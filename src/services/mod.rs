pub mod handlers;
pub mod response;
pub mod validators;

use std::{ops::Deref, sync::Arc};

use crate::adapters::repositories::MessagingRepository;

/// Shared handle on the store, cloned into every request.
#[derive(Clone)]
pub struct MessagingState(pub Arc<dyn MessagingRepository>);

impl<R: MessagingRepository + 'static> From<Arc<R>> for MessagingState {
	fn from(value: Arc<R>) -> Self {
		Self(value)
	}
}

impl Deref for MessagingState {
	type Target = dyn MessagingRepository;
	fn deref(&self) -> &Self::Target {
		self.0.as_ref()
	}
}
