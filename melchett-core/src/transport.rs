//! Transport contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::RequestDescriptor;
use crate::response::ResponseRecord;

/// Performs the actual network call.
///
/// Implementations must resolve with [`TransportError::aborted`] once the
/// request's [cancellation token](RequestDescriptor::cancellation) fires.
/// Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes `request`.
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseRecord, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseRecord, TransportError> {
        (**self).execute(request).await
    }
}
