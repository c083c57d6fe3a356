use std::collections::{HashMap, HashSet};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use client_logging::{client_debug, client_info};
use tokio_util::sync::CancellationToken;

use crate::stream::{ChannelEventSink, ReqwestStreamClient, StreamClient, StreamSettings};
use crate::{EngineEvent, Operation, RequestId, StreamError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] StreamError),
}

enum EngineCommand {
    Start {
        request_id: RequestId,
        operation: Operation,
    },
    Cancel {
        request_id: RequestId,
    },
}

type TokenMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Synchronous front for UI loops: runs streamed analyses on a background
/// runtime and hands their events back through a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    /// Requests cancelled through this handle; their queued events are dropped.
    cancelled: Mutex<HashSet<RequestId>>,
}

impl EngineHandle {
    pub fn new(settings: StreamSettings) -> Result<Self, EngineError> {
        let client = ReqwestStreamClient::new(settings)?;
        Self::with_client(Arc::new(client))
    }

    pub fn with_client(client: Arc<dyn StreamClient>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            let tokens: TokenMap = Arc::new(Mutex::new(HashMap::new()));
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &client, &tokens, &event_tx, command);
            }
            // Handle dropped: nobody is listening any more.
            for (_, token) in lock(&tokens).drain() {
                token.cancel();
            }
            client_debug!("engine command loop stopped");
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            cancelled: Mutex::new(HashSet::new()),
        })
    }

    pub fn start(&self, request_id: RequestId, operation: Operation) {
        self.cancelled_ids().remove(&request_id);
        let _ = self.cmd_tx.send(EngineCommand::Start {
            request_id,
            operation,
        });
    }

    /// Aborts a running request; none of its events are delivered afterwards,
    /// including those already waiting in the channel.
    pub fn cancel(&self, request_id: RequestId) {
        self.cancelled_ids().insert(request_id);
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        loop {
            let event = self.event_rx.try_recv().ok()?;
            if self.is_live(&event) {
                return Some(event);
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.event_rx.recv_timeout(remaining).ok()?;
            if self.is_live(&event) {
                return Some(event);
            }
        }
    }

    fn is_live(&self, event: &EngineEvent) -> bool {
        let live = !self.cancelled_ids().contains(&event.request_id);
        if !live {
            client_debug!("dropping event of cancelled request {}", event.request_id);
        }
        live
    }

    fn cancelled_ids(&self) -> std::sync::MutexGuard<'_, HashSet<RequestId>> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    client: &Arc<dyn StreamClient>,
    tokens: &TokenMap,
    event_tx: &mpsc::Sender<EngineEvent>,
    command: EngineCommand,
) {
    match command {
        EngineCommand::Start {
            request_id,
            operation,
        } => {
            let token = CancellationToken::new();
            if let Some(previous) = lock(tokens).insert(request_id, token.clone()) {
                previous.cancel();
            }
            let client = client.clone();
            let tokens = tokens.clone();
            let sink = ChannelEventSink::new(request_id, event_tx.clone());
            runtime.spawn(async move {
                client_info!("request {} started: {}", request_id, operation.label());
                let outcome = client.analyze(&operation, &sink, token.clone()).await;
                match &outcome {
                    Some(Ok(_)) => client_info!("request {} completed", request_id),
                    Some(Err(err)) => client_info!("request {} failed: {}", request_id, err),
                    None => client_info!("request {} cancelled", request_id),
                }
                lock(&tokens).remove(&request_id);
            });
        }
        EngineCommand::Cancel { request_id } => {
            if let Some(token) = lock(tokens).remove(&request_id) {
                client_debug!("cancelling request {}", request_id);
                token.cancel();
            }
        }
    }
}

fn lock(tokens: &TokenMap) -> std::sync::MutexGuard<'_, HashMap<RequestId, CancellationToken>> {
    tokens.lock().unwrap_or_else(PoisonError::into_inner)
}
