use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::DecodedItem,
    error::PlatformError,
    protocol::{methods, MethodCall},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{ChannelTransport, MethodCallHandler, MethodResult};

type SharedHandler = Arc<RwLock<Option<Arc<dyn MethodCallHandler>>>>;

struct Envelope {
    call: MethodCall,
    reply: oneshot::Sender<MethodResult>,
}

/// Application end of an in-process channel.
pub struct LoopbackTransport {
    name: String,
    to_host: mpsc::UnboundedSender<Envelope>,
    handler: SharedHandler,
}

/// Host end of an in-process channel: services application calls with the
/// handler given to [`loopback`] and pushes calls the other way.
pub struct HostEndpoint {
    name: String,
    to_client: mpsc::UnboundedSender<Envelope>,
    host_task: JoinHandle<()>,
    dispatch_task: JoinHandle<()>,
}

/// Opens a channel named `name` whose host side is served by `host`.
///
/// Each direction is drained by its own task, one call at a time, so delivery
/// is FIFO per direction and a host push can be handled while an application
/// call is outstanding. Must be called from inside a tokio runtime.
pub fn loopback(
    name: impl Into<String>,
    host: Arc<dyn MethodCallHandler>,
) -> (LoopbackTransport, HostEndpoint) {
    let name = name.into();
    let (to_host, mut host_rx) = mpsc::unbounded_channel::<Envelope>();
    let (to_client, mut client_rx) = mpsc::unbounded_channel::<Envelope>();
    let handler: SharedHandler = Arc::new(RwLock::new(None));

    let host_channel = name.clone();
    let host_task = tokio::spawn(async move {
        while let Some(Envelope { call, reply }) = host_rx.recv().await {
            debug!(channel = %host_channel, method = %call.method, "host: servicing call");
            let result = host.handle_method_call(call).await;
            let _ = reply.send(result);
        }
        debug!(channel = %host_channel, "host: application end dropped");
    });

    let dispatch_channel = name.clone();
    let dispatch_handler = Arc::clone(&handler);
    let dispatch_task = tokio::spawn(async move {
        while let Some(Envelope { call, reply }) = client_rx.recv().await {
            let current = dispatch_handler
                .read()
                .ok()
                .and_then(|guard| guard.as_ref().map(Arc::clone));
            let result = match current {
                Some(handler) => handler.handle_method_call(call).await,
                None => {
                    warn!(
                        channel = %dispatch_channel,
                        method = %call.method,
                        "no method call handler registered; dropping host call"
                    );
                    Err(PlatformError::missing_plugin(&dispatch_channel, &call.method))
                }
            };
            let _ = reply.send(result);
        }
    });

    (
        LoopbackTransport {
            name: name.clone(),
            to_host,
            handler,
        },
        HostEndpoint {
            name,
            to_client,
            host_task,
            dispatch_task,
        },
    )
}

async fn round_trip(
    channel: &str,
    tx: &mpsc::UnboundedSender<Envelope>,
    call: MethodCall,
) -> MethodResult {
    let (reply, response) = oneshot::channel();
    tx.send(Envelope { call, reply })
        .map_err(|_| PlatformError::channel_closed(channel))?;
    response
        .await
        .map_err(|_| PlatformError::channel_closed(channel))?
}

#[async_trait]
impl ChannelTransport for LoopbackTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke_method(&self, call: MethodCall) -> MethodResult {
        round_trip(&self.name, &self.to_host, call).await
    }

    fn set_method_call_handler(&self, handler: Option<Arc<dyn MethodCallHandler>>) {
        match self.handler.write() {
            Ok(mut guard) => *guard = handler,
            Err(poisoned) => *poisoned.into_inner() = handler,
        }
    }
}

impl HostEndpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pushes a call to the application and waits for its handler to finish.
    pub async fn invoke_client(&self, call: MethodCall) -> MethodResult {
        round_trip(&self.name, &self.to_client, call).await
    }

    /// Pushes a call without waiting for the application's reply.
    pub fn post_client(&self, call: MethodCall) -> Result<(), PlatformError> {
        let (reply, _) = oneshot::channel();
        self.to_client
            .send(Envelope { call, reply })
            .map_err(|_| PlatformError::channel_closed(&self.name))
    }

    pub async fn push_recognized(&self, item: &DecodedItem) -> MethodResult {
        let mut arguments = json!({
            "code": item.payload,
            "type": item.format.wire_name(),
        });
        if let Some(raw) = &item.raw_bytes {
            arguments["rawBytes"] = json!(raw);
        }
        self.invoke_client(MethodCall::new(methods::ON_RECOGNIZE_QR, arguments))
            .await
    }

    pub async fn push_permission(&self, granted: bool) -> MethodResult {
        self.invoke_client(MethodCall::new(
            methods::ON_PERMISSION_SET,
            Value::Bool(granted),
        ))
        .await
    }

    /// Tears the host side down. Outstanding calls in both directions fail
    /// with a channel-closed error.
    pub fn close(&self) {
        self.host_task.abort();
        self.dispatch_task.abort();
    }
}

impl Drop for HostEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
