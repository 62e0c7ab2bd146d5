//! Method-channel seam between application code and a host-rendered view.
//!
//! A channel carries named calls in both directions. Application code invokes
//! methods on the host and awaits a single reply; the host pushes calls back
//! that are dispatched to whichever [`MethodCallHandler`] is registered.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared::{error::PlatformError, protocol::MethodCall};

mod loopback;
mod simulated;

pub use loopback::{loopback, HostEndpoint, LoopbackTransport};
pub use simulated::SimulatedCameraHost;

pub type MethodResult = Result<Value, PlatformError>;

#[async_trait]
pub trait MethodCallHandler: Send + Sync {
    async fn handle_method_call(&self, call: MethodCall) -> MethodResult;
}

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Sends `call` to the host and waits for its reply. Calls are delivered in
    /// send order; replies are matched per call, not by position.
    async fn invoke_method(&self, call: MethodCall) -> MethodResult;

    /// Registers the receiver for host-initiated calls, replacing any previous
    /// one. `None` detaches it; later host calls fail with a missing-plugin error.
    fn set_method_call_handler(&self, handler: Option<Arc<dyn MethodCallHandler>>);
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
