//! Per-user conversation worker
//!
//! Each user with recent activity has one worker task. It receives that
//! user's events in order, runs them through the state machine, and
//! executes the resulting effects before taking the next event.

use super::traits::ChatOutbound;
use crate::error::BotError;
use crate::messages;
use crate::session::{SessionStore, UserId};
use crate::state_machine::{transition, Effect, Event, FlowContext};
use crate::telegram::Inbound;
use crate::voice_api::{VoiceGateway, VoiceSample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Worker for a single user's conversation
pub struct UserWorker<C, G>
where
    C: ChatOutbound + 'static,
    G: VoiceGateway + 'static,
{
    user_id: UserId,
    chat_id: i64,
    context: Arc<FlowContext>,
    store: Arc<SessionStore>,
    chat: Arc<C>,
    gateway: Arc<G>,
    event_rx: mpsc::Receiver<Inbound>,
    idle_timeout: Duration,
}

impl<C, G> UserWorker<C, G>
where
    C: ChatOutbound + 'static,
    G: VoiceGateway + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        context: Arc<FlowContext>,
        store: Arc<SessionStore>,
        chat: Arc<C>,
        gateway: Arc<G>,
        event_rx: mpsc::Receiver<Inbound>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            chat_id: user_id,
            context,
            store,
            chat,
            gateway,
            event_rx,
            idle_timeout,
        }
    }

    /// Process events until the channel closes or the worker sits idle.
    ///
    /// `previous` is the task of an earlier worker for the same user that may
    /// still be draining; it must finish first so events stay in order.
    pub async fn run(mut self, previous: Option<JoinHandle<()>>) {
        if let Some(previous) = previous {
            if let Err(e) = previous.await {
                tracing::warn!(user_id = self.user_id, error = %e, "Previous worker ended abnormally");
            }
        }

        tracing::debug!(user_id = self.user_id, "Worker started");

        loop {
            match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                Ok(Some(inbound)) => self.process(inbound).await,
                Ok(None) => break,
                Err(_) => {
                    // Refuse new sends, then finish what is already queued
                    self.event_rx.close();
                    while let Some(inbound) = self.event_rx.recv().await {
                        self.process(inbound).await;
                    }
                    tracing::debug!(user_id = self.user_id, "Worker idle, stopping");
                    break;
                }
            }
        }

        tracing::debug!(user_id = self.user_id, "Worker stopped");
    }

    async fn process(&mut self, inbound: Inbound) {
        self.chat_id = inbound.chat_id;
        self.process_event(inbound.event).await;
    }

    async fn process_event(&mut self, event: Event) {
        let mut session = self.store.get_or_create(self.user_id).await;

        // Gateway results are fed back through the same loop
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let label = current_event.label();
            let result = match transition(&session, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(user_id = self.user_id, event = label, error = %e, "Dropping event");
                    continue;
                }
            };

            if result.session.step != session.step {
                tracing::info!(
                    user_id = self.user_id,
                    event = label,
                    from = ?session.step,
                    to = ?result.session.step,
                    "Step changed"
                );
            }

            session = result.session;
            self.store.save(self.user_id, session.clone()).await;

            for effect in result.effects {
                if effect.calls_gateway() {
                    tracing::debug!(user_id = self.user_id, event = label, "Calling voice API");
                }
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::SendText { text } => {
                self.deliver("send_text", self.chat.send_text(self.chat_id, &text).await);
                None
            }

            Effect::PresentStyles { text } => {
                let result = self.chat.send_style_keyboard(self.chat_id, &text).await;
                self.deliver("send_style_keyboard", result);
                None
            }

            Effect::AnswerButton { callback_id } => {
                self.deliver("answer_button", self.chat.answer_button(&callback_id).await);
                None
            }

            Effect::EditButtonMessage { message_id, text } => {
                let result = self.chat.edit_text(self.chat_id, message_id, &text).await;
                self.deliver("edit_text", result);
                None
            }

            Effect::EstablishVoice { attachment, format } => {
                let bytes = match self
                    .chat
                    .fetch_file(&attachment.file_id, self.context.max_sample_bytes)
                    .await
                {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(user_id = self.user_id, error = %e, "Sample download failed");
                        self.report(&BotError::Chat(e)).await;
                        return None;
                    }
                };

                tracing::info!(
                    user_id = self.user_id,
                    sample_bytes = bytes.len(),
                    duration_secs = ?attachment.duration_secs,
                    format = ?format,
                    "Uploading voice sample"
                );
                let sample = VoiceSample::new(bytes, format);
                Some(match self.gateway.establish_voice_reference(&sample).await {
                    Ok(reference) => Event::VoiceEstablished { reference },
                    Err(error) => Event::VoiceFailed { error },
                })
            }

            Effect::Synthesize { request } => Some(match self.gateway.synthesize(&request).await {
                Ok(audio) => Event::SynthesisCompleted { audio },
                Err(error) => Event::SynthesisFailed { error },
            }),

            Effect::DeliverAudio { audio } => {
                let result = self.chat.send_audio(self.chat_id, &audio).await;
                self.deliver("send_audio", result);
                None
            }

            Effect::ReportError { error } => {
                tracing::info!(
                    user_id = self.user_id,
                    kind = error.kind_label(),
                    error = %error,
                    "Reporting error to user"
                );
                self.report(&error).await;
                None
            }

            Effect::DeleteSession => {
                self.store.reset(self.user_id).await;
                None
            }
        }
    }

    async fn report(&self, error: &BotError) {
        let text = messages::user_message(error);
        self.deliver("send_text", self.chat.send_text(self.chat_id, &text).await);
    }

    /// Chat failures are logged; the conversation carries on
    fn deliver(&self, action: &'static str, result: Result<(), crate::telegram::ChatError>) {
        if let Err(e) = result {
            tracing::warn!(
                user_id = self.user_id,
                chat_id = self.chat_id,
                action,
                status = ?e.status,
                error = %e,
                "Chat delivery failed"
            );
        }
    }
}
