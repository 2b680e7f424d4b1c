//! Runtime for executing conversations
//!
//! Events for one user are handled strictly in arrival order by that user's
//! worker. Different users are handled concurrently.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::UserWorker;
pub use traits::*;

use crate::error::{BotError, InputError};
use crate::messages;
use crate::session::{SessionStore, UserId};
use crate::state_machine::{Event, FlowContext};
use crate::telegram::Inbound;
use crate::voice_api::VoiceGateway;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Events buffered per user before dispatch waits
const WORKER_QUEUE: usize = 32;

/// Handle to a running user worker
struct WorkerHandle {
    event_tx: mpsc::Sender<Inbound>,
    task: JoinHandle<()>,
}

/// Manager for all user workers
pub struct RuntimeManager<C, G>
where
    C: ChatOutbound + 'static,
    G: VoiceGateway + 'static,
{
    context: Arc<FlowContext>,
    store: Arc<SessionStore>,
    chat: Arc<C>,
    gateway: Arc<G>,
    idle_timeout: Duration,
    workers: Mutex<HashMap<UserId, WorkerHandle>>,
}

impl<C, G> RuntimeManager<C, G>
where
    C: ChatOutbound + 'static,
    G: VoiceGateway + 'static,
{
    pub fn new(
        context: FlowContext,
        store: Arc<SessionStore>,
        chat: Arc<C>,
        gateway: Arc<G>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            context: Arc::new(context),
            store,
            chat,
            gateway,
            idle_timeout,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an event for its user's worker, starting one if needed.
    ///
    /// Never waits on the worker: a user whose queue is full gets a busy
    /// reply and the event is dropped, so other users keep being served.
    pub async fn dispatch(&self, inbound: Inbound) {
        let user_id = inbound.user_id;
        let mut inbound = inbound;

        // A worker that went idle between lookup and send rejects the event;
        // the second attempt gets a fresh worker.
        for _ in 0..2 {
            let event_tx = self.sender_for(user_id).await;
            match event_tx.try_send(inbound) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    tracing::warn!(
                        user_id,
                        event = returned.event.label(),
                        "Worker queue full, dropping event"
                    );
                    self.reply_busy(returned);
                    return;
                }
                Err(TrySendError::Closed(returned)) => inbound = returned,
            }
        }

        tracing::error!(user_id, event = inbound.event.label(), "Could not dispatch event");
    }

    /// Tell the user to wait, without holding up dispatch
    fn reply_busy(&self, inbound: Inbound) {
        let chat = Arc::clone(&self.chat);
        let text = messages::user_message(&BotError::InvalidInput(InputError::Busy));
        tokio::spawn(async move {
            if let Event::StylePressed { callback_id, .. } = &inbound.event {
                if let Err(e) = chat.answer_button(callback_id).await {
                    tracing::warn!(user_id = inbound.user_id, error = %e, "Busy answer failed");
                }
            }
            if let Err(e) = chat.send_text(inbound.chat_id, &text).await {
                tracing::warn!(user_id = inbound.user_id, error = %e, "Busy reply failed");
            }
        });
    }

    async fn sender_for(&self, user_id: UserId) -> mpsc::Sender<Inbound> {
        let mut workers = self.workers.lock().await;

        if let Some(handle) = workers.get(&user_id) {
            if !handle.event_tx.is_closed() {
                return handle.event_tx.clone();
            }
        }

        let previous = workers.remove(&user_id).map(|handle| handle.task);
        let (event_tx, event_rx) = mpsc::channel(WORKER_QUEUE);
        let worker = UserWorker::new(
            user_id,
            Arc::clone(&self.context),
            Arc::clone(&self.store),
            Arc::clone(&self.chat),
            Arc::clone(&self.gateway),
            event_rx,
            self.idle_timeout,
        );
        let task = tokio::spawn(worker.run(previous));

        workers.insert(
            user_id,
            WorkerHandle {
                event_tx: event_tx.clone(),
                task,
            },
        );
        event_tx
    }

    /// Forget workers that have stopped. Returns how many were removed.
    pub async fn reap_idle(&self) -> usize {
        let mut workers = self.workers.lock().await;
        let before = workers.len();
        workers.retain(|_, handle| !(handle.event_tx.is_closed() && handle.task.is_finished()));
        before - workers.len()
    }

    pub async fn active_workers(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Periodically drop expired sessions and stopped workers
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let expired = self.store.purge_expired().await;
                    let reaped = self.reap_idle().await;
                    if expired > 0 || reaped > 0 {
                        let sessions = self.store.len().await;
                        let workers = self.active_workers().await;
                        tracing::info!(expired, reaped, sessions, workers, "Swept idle conversations");
                    }
                }
            }
        }

        tracing::info!("Sweeper stopped");
    }

    /// Stop accepting events and let every worker finish its queue
    pub async fn shutdown(&self) {
        let workers: Vec<_> = self.workers.lock().await.drain().collect();
        tracing::info!(count = workers.len(), "Stopping workers");

        for (user_id, handle) in workers {
            drop(handle.event_tx);
            if let Err(e) = handle.task.await {
                tracing::warn!(user_id, error = %e, "Worker ended abnormally");
            }
        }
    }
}
