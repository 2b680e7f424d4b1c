//! Mock implementations for testing
//!
//! These mocks enable end-to-end conversation tests without real I/O.

use super::traits::*;
use super::RuntimeManager;
use crate::config::FlowVariant;
use crate::session::{SessionStore, UserId};
use crate::state_machine::{Attachment, Event, FlowContext};
use crate::telegram::{ChatError, Inbound};
use crate::voice_api::{
    AudioFormat, GatewayError, SynthesisRequest, SynthesizedAudio, VoiceGateway, VoiceReference,
    VoiceSample,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Voice Gateway
// ============================================================================

/// Mock gateway that returns queued results
#[allow(dead_code)]
pub struct MockGateway {
    uploads: Mutex<VecDeque<Result<VoiceReference, GatewayError>>>,
    syntheses: Mutex<VecDeque<Result<SynthesizedAudio, GatewayError>>>,
    /// Record of all uploaded samples
    pub samples: Mutex<Vec<VoiceSample>>,
    /// Record of all synthesis requests
    pub requests: Mutex<Vec<SynthesisRequest>>,
    /// When set, uploads wait for a notification before answering
    upload_gate: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(VecDeque::new()),
            syntheses: Mutex::new(VecDeque::new()),
            samples: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            upload_gate: Mutex::new(None),
        }
    }

    /// Hold every upload until the returned handle is notified
    pub fn hold_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn queue_voice(&self, id: &str) {
        self.uploads
            .lock()
            .unwrap()
            .push_back(Ok(VoiceReference::new(id)));
    }

    pub fn queue_upload_error(&self, error: GatewayError) {
        self.uploads.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_audio(&self, bytes: &[u8]) {
        self.syntheses.lock().unwrap().push_back(Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            format: AudioFormat::Mp3,
        }));
    }

    pub fn queue_synthesis_error(&self, error: GatewayError) {
        self.syntheses.lock().unwrap().push_back(Err(error));
    }

    pub fn upload_count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGateway for MockGateway {
    async fn establish_voice_reference(
        &self,
        sample: &VoiceSample,
    ) -> Result<VoiceReference, GatewayError> {
        self.samples.lock().unwrap().push(sample.clone());
        let gate = self.upload_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("No mock upload queued")))
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.syntheses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("No mock synthesis queued")))
    }
}

// ============================================================================
// Recording Chat
// ============================================================================

/// Everything the bot sent to the chat platform
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String },
    Keyboard { chat_id: i64, text: String },
    Edit { message_id: i64, text: String },
    Answer { callback_id: String },
    Audio { chat_id: i64, bytes: Vec<u8> },
}

/// Chat double that records outbound traffic and serves uploaded files
#[allow(dead_code)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<Sent>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[allow(dead_code)]
impl RecordingChat {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|sent| match sent {
                Sent::Text { chat_id: c, .. }
                | Sent::Keyboard { chat_id: c, .. }
                | Sent::Audio { chat_id: c, .. } => *c == chat_id,
                Sent::Edit { .. } | Sent::Answer { .. } => false,
            })
            .cloned()
            .collect()
    }

    /// Texts sent to a chat, keyboards included
    pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
        self.sent_to(chat_id)
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { text, .. } | Sent::Keyboard { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn audio_to(&self, chat_id: i64) -> Vec<Vec<u8>> {
        self.sent_to(chat_id)
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Audio { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn keyboards_to(&self, chat_id: i64) -> usize {
        self.sent_to(chat_id)
            .iter()
            .filter(|sent| matches!(sent, Sent::Keyboard { .. }))
            .count()
    }

    pub fn all(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatOutbound for RecordingChat {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_style_keyboard(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Keyboard {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn edit_text(
        &self,
        _chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Edit {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn answer_button(&self, callback_id: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Answer {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }

    async fn send_audio(&self, chat_id: i64, audio: &SynthesizedAudio) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(Sent::Audio {
            chat_id,
            bytes: audio.bytes.clone(),
        });
        Ok(())
    }

    async fn fetch_file(&self, file_id: &str, _max_bytes: u64) -> Result<Vec<u8>, ChatError> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ChatError::with_status(400, "Bad Request: invalid file_id"))
    }
}

// ============================================================================
// Test Harness
// ============================================================================

/// Builder for a runtime wired to mocks
#[allow(dead_code)]
pub struct TestRuntime {
    variant: FlowVariant,
    session_ttl: Duration,
    idle_timeout: Duration,
}

#[allow(dead_code)]
impl TestRuntime {
    pub fn new() -> Self {
        Self {
            variant: FlowVariant::Guided,
            session_ttl: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(600),
        }
    }

    pub fn variant(mut self, variant: FlowVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    pub fn build(self) -> Harness {
        let chat = Arc::new(RecordingChat::new());
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(SessionStore::new(self.session_ttl));
        let manager = RuntimeManager::new(
            FlowContext::new(self.variant),
            Arc::clone(&store),
            Arc::clone(&chat),
            Arc::clone(&gateway),
            self.idle_timeout,
        );
        Harness {
            manager,
            chat,
            gateway,
            store,
        }
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
pub struct Harness {
    pub manager: RuntimeManager<RecordingChat, MockGateway>,
    pub chat: Arc<RecordingChat>,
    pub gateway: Arc<MockGateway>,
    pub store: Arc<SessionStore>,
}

#[allow(dead_code)]
impl Harness {
    async fn send(&self, user_id: UserId, event: Event) {
        self.manager
            .dispatch(Inbound {
                user_id,
                chat_id: user_id,
                event,
            })
            .await;
    }

    pub async fn voice(&self, user_id: UserId, file_id: &str) {
        self.chat.add_file(file_id, b"OggS-sample");
        let attachment = Attachment {
            file_id: file_id.to_string(),
            mime_type: Some("audio/ogg".to_string()),
            file_size: Some(11),
            duration_secs: Some(10),
        };
        self.send(user_id, Event::SampleReceived { attachment })
            .await;
    }

    pub async fn text(&self, user_id: UserId, text: &str) {
        self.send(user_id, Event::from_text(text)).await;
    }

    pub async fn press(&self, user_id: UserId, data: &str) {
        self.send(
            user_id,
            Event::StylePressed {
                callback_id: format!("cb-{user_id}"),
                data: data.to_string(),
                message_id: Some(500),
            },
        )
        .await;
    }

    /// Wait until every queued event has been fully handled
    pub async fn flush(&self) {
        self.manager.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BotError, InputError};
    use crate::messages::{self, user_message};
    use crate::session::{Session, Step};
    use tokio_util::sync::CancellationToken;

    const ANN: UserId = 42;
    const BOB: UserId = 77;

    #[tokio::test]
    async fn test_mock_gateway_empty_queue_fails() {
        let gateway = MockGateway::new();
        let request = SynthesisRequest {
            text: "hi".to_string(),
            voice: VoiceReference::new("v"),
            emotion: "neutral".to_string(),
            speed: 1.0,
        };
        assert!(gateway.synthesize(&request).await.is_err());
        assert_eq!(gateway.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_full_flow_reuses_voice() {
        let h = TestRuntime::new().build();
        h.gateway.queue_voice("voice-ann");
        h.gateway.queue_audio(b"first");
        h.gateway.queue_audio(b"second");

        h.text(ANN, "/start").await;
        h.voice(ANN, "file-1").await;
        h.text(ANN, "Hello there").await;
        h.press(ANN, "style:happy").await;
        h.text(ANN, "Once more").await;
        h.press(ANN, "style:sad").await;
        h.flush().await;

        assert_eq!(h.gateway.upload_count(), 1);
        let requests = h.gateway.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|r| r.voice == VoiceReference::new("voice-ann")));
        assert_eq!(requests[0].text, "Hello there");
        assert_eq!(requests[0].emotion, "happy");
        assert_eq!(requests[1].text, "Once more");
        assert_eq!(requests[1].emotion, "sad");

        assert_eq!(h.chat.audio_to(ANN), vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(h.chat.keyboards_to(ANN), 2);
        assert!(h
            .chat
            .all()
            .contains(&Sent::Answer { callback_id: format!("cb-{ANN}") }));

        let session = h.store.get(ANN).await.unwrap();
        assert_eq!(session.step, Step::AwaitingText);
        assert_eq!(session.voice_reference, Some(VoiceReference::new("voice-ann")));
    }

    #[tokio::test]
    async fn test_text_too_long_is_rejected() {
        let h = TestRuntime::new().build();
        h.gateway.queue_voice("voice-ann");

        h.voice(ANN, "file-1").await;
        h.text(ANN, &"a".repeat(1001)).await;
        h.flush().await;

        assert_eq!(h.chat.keyboards_to(ANN), 0);
        let texts = h.chat.texts_to(ANN);
        assert!(texts.last().unwrap().contains("1000"));
        assert_eq!(h.store.get(ANN).await.unwrap().step, Step::AwaitingText);
    }

    #[tokio::test]
    async fn test_style_press_without_session() {
        let h = TestRuntime::new().build();

        h.press(ANN, "style:happy").await;
        h.flush().await;

        assert_eq!(h.gateway.upload_count(), 0);
        assert!(h.gateway.recorded_requests().is_empty());
        assert!(h.chat.all().contains(&Sent::Answer {
            callback_id: format!("cb-{ANN}")
        }));
        assert!(h.chat.texts_to(ANN)[0].contains(messages::SEND_SAMPLE_FIRST));
    }

    #[tokio::test]
    async fn test_text_before_sample() {
        let h = TestRuntime::new().build();

        h.text(ANN, "Hello").await;
        h.flush().await;

        assert!(h.gateway.recorded_requests().is_empty());
        assert!(h.chat.texts_to(ANN)[0].contains(messages::SEND_SAMPLE_FIRST));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let h = TestRuntime::new().build();
        h.gateway.queue_voice("voice-a");
        h.gateway.queue_voice("voice-b");
        h.gateway.queue_audio(b"a");
        h.gateway.queue_audio(b"b");

        h.voice(ANN, "file-a").await;
        h.flush().await;
        h.voice(BOB, "file-b").await;
        h.flush().await;

        h.text(ANN, "from ann").await;
        h.text(BOB, "from bob").await;
        h.press(BOB, "style:calm").await;
        h.flush().await;
        h.press(ANN, "style:angry").await;
        h.flush().await;

        let requests = h.gateway.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].voice, VoiceReference::new("voice-b"));
        assert_eq!(requests[0].text, "from bob");
        assert_eq!(requests[1].voice, VoiceReference::new("voice-a"));
        assert_eq!(requests[1].text, "from ann");

        assert_eq!(h.chat.audio_to(BOB), vec![b"a".to_vec()]);
        assert_eq!(h.chat.audio_to(ANN), vec![b"b".to_vec()]);
    }

    #[tokio::test]
    async fn test_busy_user_does_not_block_others() {
        let h = TestRuntime::new().build();
        let release = h.gateway.hold_uploads();
        h.gateway.queue_voice("voice-ann");

        h.voice(ANN, "file-1").await;
        for i in 0..40 {
            tokio::time::timeout(Duration::from_millis(200), h.text(ANN, &format!("line {i}")))
                .await
                .expect("dispatch waited on a busy worker");
        }

        h.text(BOB, "Hello").await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while h.chat.texts_to(BOB).is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("second user got no reply");
        assert!(h.chat.texts_to(BOB)[0].contains(messages::SEND_SAMPLE_FIRST));

        release.notify_one();
        h.flush().await;

        let busy = user_message(&BotError::InvalidInput(InputError::Busy));
        assert!(h.chat.texts_to(ANN).contains(&busy));
        assert_eq!(h.gateway.upload_count(), 1);
        assert_eq!(h.store.get(ANN).await.unwrap().step, Step::AwaitingStyleChoice);
    }

    #[tokio::test]
    async fn test_reset_forgets_voice() {
        let h = TestRuntime::new().build();
        h.gateway.queue_voice("voice-ann");

        h.voice(ANN, "file-1").await;
        h.text(ANN, "Hello").await;
        h.text(ANN, "/reset").await;
        h.flush().await;

        assert!(h.store.get(ANN).await.is_none());

        h.text(ANN, "Hello again").await;
        h.flush().await;

        assert!(h.gateway.recorded_requests().is_empty());
        let texts = h.chat.texts_to(ANN);
        assert!(texts.contains(&messages::RESET_DONE.to_string()));
        assert!(texts.last().unwrap().contains(messages::SEND_SAMPLE_FIRST));
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_voice() {
        let h = TestRuntime::new().build();
        h.gateway.queue_voice("voice-ann");
        h.gateway
            .queue_synthesis_error(GatewayError::rejected(500, "internal error sk-secret"));
        h.gateway.queue_audio(b"retry");

        h.voice(ANN, "file-1").await;
        h.text(ANN, "Hello").await;
        h.press(ANN, "style:neutral").await;
        h.flush().await;

        let session = h.store.get(ANN).await.unwrap();
        assert_eq!(session.step, Step::AwaitingText);
        assert!(session.pending_text.is_none());
        assert!(h.chat.texts_to(ANN).iter().all(|t| !t.contains("sk-secret")));

        h.text(ANN, "Hello").await;
        h.press(ANN, "style:neutral").await;
        h.flush().await;

        assert_eq!(h.gateway.upload_count(), 1);
        assert_eq!(h.chat.audio_to(ANN), vec![b"retry".to_vec()]);
    }

    #[tokio::test]
    async fn test_upload_failure_stays_awaiting_sample() {
        let h = TestRuntime::new().build();
        h.gateway
            .queue_upload_error(GatewayError::rejected(400, "sample too short"));

        h.voice(ANN, "file-1").await;
        h.flush().await;

        assert_eq!(h.store.get(ANN).await.unwrap().step, Step::AwaitingSample);
        assert!(h.chat.texts_to(ANN).last().unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn test_missing_file_reported() {
        let h = TestRuntime::new().build();
        let attachment = Attachment {
            file_id: "gone".to_string(),
            mime_type: Some("audio/ogg".to_string()),
            file_size: None,
            duration_secs: None,
        };

        h.send(ANN, Event::SampleReceived { attachment }).await;
        h.flush().await;

        assert_eq!(h.gateway.upload_count(), 0);
        assert!(h.chat.texts_to(ANN).last().unwrap().contains("send it again"));
    }

    #[tokio::test]
    async fn test_quick_flow_skips_keyboard() {
        let h = TestRuntime::new().variant(FlowVariant::Quick).build();
        h.gateway.queue_voice("voice-ann");
        h.gateway.queue_audio(b"quick");

        h.voice(ANN, "file-1").await;
        h.text(ANN, "Hello").await;
        h.flush().await;

        assert_eq!(h.chat.keyboards_to(ANN), 0);
        assert_eq!(h.chat.audio_to(ANN), vec![b"quick".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_asks_for_sample() {
        let h = TestRuntime::new()
            .session_ttl(Duration::from_secs(60))
            .build();
        h.gateway.queue_voice("voice-ann");

        h.voice(ANN, "file-1").await;
        h.flush().await;

        tokio::time::advance(Duration::from_secs(61)).await;

        h.text(ANN, "Hello").await;
        h.flush().await;

        assert!(h.gateway.recorded_requests().is_empty());
        assert!(h.chat.texts_to(ANN).last().unwrap().contains("expired"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_and_stops() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let manager = Arc::new(RuntimeManager::new(
            FlowContext::new(FlowVariant::Guided),
            Arc::clone(&store),
            Arc::new(RecordingChat::new()),
            Arc::new(MockGateway::new()),
            Duration::from_secs(600),
        ));
        store.save(ANN, Session::default()).await;

        let cancel = CancellationToken::new();
        let sweeper = tokio::spawn(
            Arc::clone(&manager).run_sweeper(Duration::from_secs(30), cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.len().await, 0);

        cancel.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_respawns() {
        let h = TestRuntime::new()
            .idle_timeout(Duration::from_secs(5))
            .build();
        h.gateway.queue_voice("voice-ann");

        h.voice(ANN, "file-1").await;
        assert_eq!(h.manager.active_workers().await, 1);

        // Paused time auto-advances past the idle timeout
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.manager.reap_idle().await, 1);
        assert_eq!(h.manager.active_workers().await, 0);

        h.text(ANN, "Hello").await;
        h.flush().await;

        assert_eq!(h.chat.keyboards_to(ANN), 1);
        assert_eq!(h.store.get(ANN).await.unwrap().step, Step::AwaitingStyleChoice);
    }
}
