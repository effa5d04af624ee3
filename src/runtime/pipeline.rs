//! Session-serialized turn processing.
//!
//! Each user gets a lane: a queue, a worker task that owns the user's
//! [`DialogSession`] and runs turns strictly in arrival order, and a
//! delivery task that sends finished replies through the transport with
//! pacing. Different users' lanes run concurrently, bounded by a shared
//! semaphore, and a lane stuck waiting out the pacing gap never holds a
//! worker permit.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::dialog::{DialogEngine, DialogSession};
use crate::runtime::pacing::ReplyPacer;
use crate::runtime::transport::Transport;

enum TurnRequest {
    Greet,
    Utterance(String),
}

struct SessionLane {
    turn_tx: mpsc::Sender<TurnRequest>,
    worker: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

/// Entry point for inbound traffic.
///
/// `submit` never blocks on another user's turn: it only queues. All
/// processing happens on the lane tasks.
pub struct TurnPipeline {
    engine: Arc<DialogEngine>,
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    lanes: DashMap<String, SessionLane>,
    permits: Arc<Semaphore>,
}

impl TurnPipeline {
    pub fn new(engine: Arc<DialogEngine>, transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_turns));
        Self {
            engine,
            transport,
            config,
            lanes: DashMap::new(),
            permits,
        }
    }

    /// Queue one utterance for a user. Turns of the same user are processed
    /// one at a time in arrival order; turns of different users proceed
    /// independently.
    pub async fn submit(&self, user_id: &str, text: impl Into<String>) {
        self.enqueue(user_id, TurnRequest::Utterance(text.into()))
            .await;
    }

    /// Queue a first-contact greeting for a user.
    pub async fn greet(&self, user_id: &str) {
        self.enqueue(user_id, TurnRequest::Greet).await;
    }

    async fn enqueue(&self, user_id: &str, request: TurnRequest) {
        let mut request = request;
        // One retry: a lane that was removed mid-flight gets respawned with
        // a fresh session.
        for _ in 0..2 {
            let tx = {
                let lane = self
                    .lanes
                    .entry(user_id.to_string())
                    .or_insert_with(|| self.spawn_lane(user_id));
                lane.turn_tx.clone()
            };
            match tx.send(request).await {
                Ok(()) => return,
                Err(failed) => {
                    self.lanes.remove(user_id);
                    request = failed.0;
                }
            }
        }
        log::error!("turn for user {user_id} dropped: lane unavailable");
    }

    fn spawn_lane(&self, user_id: &str) -> SessionLane {
        log::info!("starting session lane for user {user_id}");
        let (turn_tx, mut turn_rx) = mpsc::channel::<TurnRequest>(self.config.lane_capacity);
        let (reply_tx, mut reply_rx) = mpsc::channel::<Vec<String>>(self.config.lane_capacity);

        let transport = self.transport.clone();
        let pace = self.config.pace();
        let user = user_id.to_string();
        let delivery = tokio::spawn(async move {
            let pacer = ReplyPacer::new(pace);
            while let Some(batch) = reply_rx.recv().await {
                for text in batch {
                    pacer.pace().await;
                    if let Err(e) = transport.deliver(&user, &text).await {
                        log::error!("delivery to user {user} failed: {e}");
                    }
                }
            }
        });

        let engine = self.engine.clone();
        let permits = self.permits.clone();
        let patience = self.config.patience;
        let user = user_id.to_string();
        let worker = tokio::spawn(async move {
            let mut session = DialogSession::new(&user, patience);
            while let Some(request) = turn_rx.recv().await {
                let Ok(_permit) = permits.acquire().await else {
                    break;
                };
                let replies = match request {
                    TurnRequest::Greet => vec![engine.greet(&session)],
                    TurnRequest::Utterance(text) => engine.respond(&mut session, &text).await,
                };
                if replies.is_empty() {
                    continue;
                }
                if reply_tx.send(replies).await.is_err() {
                    break;
                }
            }
        });

        SessionLane {
            turn_tx,
            worker,
            delivery,
        }
    }

    /// Drop a user's lane immediately. Queued turns and undelivered replies
    /// are discarded; the next message from the user starts a fresh session.
    pub fn remove_session(&self, user_id: &str) -> bool {
        match self.lanes.remove(user_id) {
            Some((_, lane)) => {
                lane.worker.abort();
                lane.delivery.abort();
                log::info!("session lane for user {user_id} removed");
                true
            }
            None => false,
        }
    }

    /// Number of live session lanes.
    pub fn session_count(&self) -> usize {
        self.lanes.len()
    }

    /// Stop accepting work and wait until every queued turn is processed and
    /// every reply delivered.
    pub async fn shutdown(self) {
        log::info!("shutting down {} session lanes", self.lanes.len());
        let mut workers = Vec::new();
        let mut deliveries = Vec::new();
        let users: Vec<String> = self.lanes.iter().map(|e| e.key().clone()).collect();
        for user in users {
            if let Some((_, lane)) = self.lanes.remove(&user) {
                // Dropping turn_tx lets the worker drain its queue and exit.
                workers.push(lane.worker);
                deliveries.push(lane.delivery);
            }
        }
        for result in join_all(workers).await {
            if let Err(e) = result {
                log::warn!("turn worker ended abnormally: {e}");
            }
        }
        // Workers closed their reply channels; deliveries flush and exit.
        for result in join_all(deliveries).await {
            if let Err(e) = result {
                log::warn!("delivery task ended abnormally: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::{CaseFoldTagger, FeaturePipeline, HashingEmbedder, RegexTokenizer};
    use crate::policy::{ActionError, ActionHandler};
    use crate::routing::compile_routes;
    use crate::runtime::transport::{ChannelTransport, OutboundMessage};
    use crate::say::Phrasebook;
    use crate::slots::KeywordClassifier;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::Receiver;
    use tokio::time::timeout;

    struct DemoActions;

    #[async_trait]
    impl ActionHandler for DemoActions {
        async fn run(
            &self,
            action_id: &str,
            _slots: &[(String, String)],
        ) -> Result<Vec<String>, ActionError> {
            match action_id {
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    Ok(vec!["slow()".to_string()])
                }
                "triple" => Ok(vec!["раз".into(), "два".into(), "три".into()]),
                other => Ok(vec![format!("{other}()")]),
            }
        }
    }

    fn engine() -> Arc<DialogEngine> {
        let pipeline = Arc::new(FeaturePipeline::with_default_stages(
            Arc::new(RegexTokenizer::new()),
            Arc::new(CaseFoldTagger::new()),
            Arc::new(HashingEmbedder::new(8)),
        ));
        let intents = KeywordClassifier::new()
            .with_label("slow_intent", &["медленно"])
            .with_label("triple_intent", &["трижды"])
            .with_label("echo_intent", &["эхо"]);
        let graphs = compile_routes(&json!({
            "slow_intent": [{"action": "slow"}],
            "triple_intent": [{"action": "triple"}],
            "echo_intent": [{"action": "echo"}]
        }))
        .unwrap();
        Arc::new(DialogEngine::new(
            pipeline,
            Vec::new(),
            Arc::new(intents),
            graphs,
            Arc::new(DemoActions),
            Arc::new(Phrasebook::embedded()),
        ))
    }

    fn pipeline_with_pace(pace_ms: u64) -> (TurnPipeline, Receiver<OutboundMessage>) {
        let (transport, rx) = ChannelTransport::pair(64);
        let config = EngineConfig {
            pace_ms,
            ..EngineConfig::default()
        };
        (
            TurnPipeline::new(engine(), Arc::new(transport), config),
            rx,
        )
    }

    async fn recv(rx: &mut Receiver<OutboundMessage>) -> OutboundMessage {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for reply")
            .expect("transport closed early")
    }

    #[tokio::test]
    async fn test_same_user_turns_run_in_order() {
        let (pipeline, mut rx) = pipeline_with_pace(0);
        pipeline.submit("u1", "медленно").await;
        pipeline.submit("u1", "эхо").await;

        assert_eq!(recv(&mut rx).await.text, "slow()");
        assert_eq!(recv(&mut rx).await.text, "echo()");
    }

    #[tokio::test]
    async fn test_users_do_not_block_each_other() {
        let (pipeline, mut rx) = pipeline_with_pace(0);
        pipeline.submit("u1", "медленно").await;
        pipeline.submit("u2", "эхо").await;

        // u2 was submitted later but is not stuck behind u1's slow turn.
        let first = recv(&mut rx).await;
        assert_eq!(first.user_id, "u2");
        assert_eq!(first.text, "echo()");
        let second = recv(&mut rx).await;
        assert_eq!(second.user_id, "u1");
        assert_eq!(second.text, "slow()");
    }

    #[tokio::test]
    async fn test_greet_delivers_greeting() {
        let (pipeline, mut rx) = pipeline_with_pace(0);
        pipeline.greet("u1").await;
        assert_eq!(recv(&mut rx).await.text, Phrasebook::embedded().get("greeting"));
        assert_eq!(pipeline.session_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_session_cancels_pending_deliveries() {
        let (pipeline, mut rx) = pipeline_with_pace(60);
        pipeline.submit("u1", "трижды").await;

        // First part arrives immediately, the rest are still being paced.
        assert_eq!(recv(&mut rx).await.text, "раз");
        assert!(pipeline.remove_session("u1"));
        assert_eq!(pipeline.session_count(), 0);

        let leftover = timeout(Duration::from_millis(250), rx.recv()).await;
        assert!(leftover.is_err(), "delivery survived session removal");
    }

    #[tokio::test]
    async fn test_remove_unknown_session_is_noop() {
        let (pipeline, _rx) = pipeline_with_pace(0);
        assert!(!pipeline.remove_session("nobody"));
    }

    #[tokio::test]
    async fn test_fresh_session_after_removal() {
        let (pipeline, mut rx) = pipeline_with_pace(0);
        pipeline.submit("u1", "эхо").await;
        assert_eq!(recv(&mut rx).await.text, "echo()");
        pipeline.remove_session("u1");

        pipeline.submit("u1", "эхо").await;
        assert_eq!(recv(&mut rx).await.text, "echo()");
        assert_eq!(pipeline.session_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queues_and_deliveries() {
        let (pipeline, mut rx) = pipeline_with_pace(0);
        pipeline.submit("u1", "эхо").await;
        pipeline.submit("u1", "трижды").await;
        pipeline.submit("u2", "эхо").await;
        pipeline.shutdown().await;

        let mut texts = Vec::new();
        while let Some(msg) = rx.recv().await {
            texts.push((msg.user_id, msg.text));
        }
        let u1: Vec<&str> = texts
            .iter()
            .filter(|(u, _)| u == "u1")
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(u1, vec!["echo()", "раз", "два", "три"]);
        assert!(texts.iter().any(|(u, t)| u == "u2" && t == "echo()"));
    }
}
