//! The contract shared by primitive steps and sagas.

use async_trait::async_trait;

use crate::Result;

/// A unit of work with a typed request and response.
///
/// Primitive actions wrap one conditional store operation; sagas compose
/// primitive actions and compensate them. Both only touch the collections
/// they were constructed with.
#[async_trait]
pub trait Action: Send + Sync {
    type Request: Send + Sync;
    type Response: Send;

    /// Step name used for logs, errors and recorded timings.
    fn name(&self) -> &'static str;

    async fn execute(&self, request: &Self::Request) -> Result<Self::Response>;
}
