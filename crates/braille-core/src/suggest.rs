//! Word-completion requests.
//!
//! The session never talks to the network itself. It hands a
//! [`SuggestionTicket`] to a [`SuggestionWorker`], which runs a
//! [`SuggestionRequester`] on its own thread and sends back a
//! [`SuggestionReply`] tagged with the ticket's sequence number. Deciding
//! whether a reply is still current is the session's job.
//!
//! The owner is expected to poll for replies. Replies that are still unread
//! when a newer ticket is submitted can only be stale, so `submit` and
//! `invalidate` discard them and the reply queue never grows past the
//! replies for the newest ticket.

use crate::config::SuggestConfig;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("no suggestion service configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("failed to encode suggestion request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed suggestion response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("suggestion requester panicked: {0}")]
    Panicked(String),
    #[error("failed to spawn suggestion worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Something that can turn a partial word into completion candidates.
///
/// Implementations block; they are only ever called from the worker thread.
pub trait SuggestionRequester: Send + 'static {
    fn request(&self, input: &str) -> Result<Vec<String>, SuggestError>;
}

impl<F> SuggestionRequester for F
where
    F: Fn(&str) -> Result<Vec<String>, SuggestError> + Send + 'static,
{
    fn request(&self, input: &str) -> Result<Vec<String>, SuggestError> {
        self(input)
    }
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    suggestions: Vec<String>,
}

pub fn suggest_endpoint(base_url: &str) -> String {
    format!("{}/suggest", base_url.trim().trim_end_matches('/'))
}

pub fn encode_request(input: &str) -> Result<String, SuggestError> {
    serde_json::to_string(&SuggestRequest { input }).map_err(SuggestError::Encode)
}

pub fn parse_response(body: &str) -> Result<Vec<String>, SuggestError> {
    let response: SuggestResponse = serde_json::from_str(body).map_err(SuggestError::Decode)?;
    Ok(response.suggestions)
}

/// `POST {base_url}/suggest` with `{"input": ...}`, expecting
/// `{"suggestions": [...]}` back.
pub struct HttpRequester {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpRequester {
    pub fn new(config: &SuggestConfig) -> Result<Self, SuggestError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SuggestError::NotConfigured)?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();

        let endpoint = suggest_endpoint(base_url);
        info!("Suggestion endpoint: {}", endpoint);
        Ok(Self { agent, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SuggestionRequester for HttpRequester {
    fn request(&self, input: &str) -> Result<Vec<String>, SuggestError> {
        let body = encode_request(input)?;
        let text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map_err(|e| SuggestError::Http(format!("{}: {e}", self.endpoint)))?
            .into_body()
            .read_to_string()
            .map_err(|e| SuggestError::Http(format!("{}: {e}", self.endpoint)))?;
        parse_response(&text)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub seq: u64,
    pub input: String,
}

#[derive(Debug)]
pub struct SuggestionReply {
    pub seq: u64,
    pub input: String,
    pub outcome: Result<Vec<String>, SuggestError>,
}

pub struct SuggestionWorker {
    ticket_tx: Sender<SuggestionTicket>,
    reply_rx: Receiver<SuggestionReply>,
    latest: Arc<AtomicU64>,
}

impl SuggestionWorker {
    pub fn spawn<R: SuggestionRequester>(requester: R) -> Result<Self, SuggestError> {
        let (ticket_tx, ticket_rx) = crossbeam_channel::unbounded::<SuggestionTicket>();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<SuggestionReply>();
        let latest = Arc::new(AtomicU64::new(0));

        {
            let latest = Arc::clone(&latest);
            thread::Builder::new()
                .name("braille-suggest".into())
                .spawn(move || suggestion_worker(requester, ticket_rx, reply_tx, latest))?;
        }

        Ok(Self {
            ticket_tx,
            reply_rx,
            latest,
        })
    }

    /// Worker with no thread behind it; tests drive the channels directly.
    #[cfg(test)]
    pub(crate) fn from_channels(
        ticket_tx: Sender<SuggestionTicket>,
        reply_rx: Receiver<SuggestionReply>,
    ) -> Self {
        Self {
            ticket_tx,
            reply_rx,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues a request. Returns `false` if the worker is gone and no reply
    /// will ever come.
    pub fn submit(&self, seq: u64, input: String) -> bool {
        self.latest.store(seq, Ordering::SeqCst);
        self.discard_unread();
        if self.ticket_tx.send(SuggestionTicket { seq, input }).is_err() {
            warn!("Suggestion worker has stopped; request #{} dropped", seq);
            return false;
        }
        true
    }

    /// Marks every ticket older than `seq` as superseded without issuing a
    /// new one.
    pub fn invalidate(&self, seq: u64) {
        self.latest.store(seq, Ordering::SeqCst);
        self.discard_unread();
    }

    fn discard_unread(&self) {
        let dropped = self.reply_rx.try_iter().count();
        if dropped > 0 {
            debug!("Discarded {} unread suggestion replies", dropped);
        }
    }

    pub fn try_recv(&self) -> Option<SuggestionReply> {
        self.reply_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SuggestionReply> {
        match self.reply_rx.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Suggestion worker disconnected");
                None
            }
        }
    }
}

fn suggestion_worker<R: SuggestionRequester>(
    requester: R,
    rx: Receiver<SuggestionTicket>,
    tx: Sender<SuggestionReply>,
    latest: Arc<AtomicU64>,
) {
    while let Ok(ticket) = rx.recv() {
        // Drain: if multiple tickets queued, skip to latest
        let mut newest = ticket;
        while let Ok(newer) = rx.try_recv() {
            newest = newer;
        }

        if newest.seq != latest.load(Ordering::SeqCst) {
            debug!("Skipping superseded suggestion request #{}", newest.seq);
            continue;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| requester.request(&newest.input)))
            .unwrap_or_else(|payload| {
                let msg = panic_message(payload.as_ref());
                warn!("Suggestion request #{} panicked: {}", newest.seq, msg);
                Err(SuggestError::Panicked(msg))
            });
        let reply = SuggestionReply {
            seq: newest.seq,
            input: newest.input,
            outcome,
        };
        if tx.send(reply).is_err() {
            break;
        }
    }
    debug!("Suggestion worker exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(input: &str) -> Result<Vec<String>, SuggestError> {
        Ok(vec![format!("{}-1", input), format!("{}-2", input)])
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            suggest_endpoint("http://localhost:5000"),
            "http://localhost:5000/suggest"
        );
        assert_eq!(
            suggest_endpoint("http://localhost:5000/"),
            "http://localhost:5000/suggest"
        );
        assert_eq!(
            suggest_endpoint(" https://api.example.test/v1// "),
            "https://api.example.test/v1/suggest"
        );
    }

    #[test]
    fn test_request_body() {
        assert_eq!(encode_request("he").unwrap(), r#"{"input":"he"}"#);
        assert_eq!(encode_request("").unwrap(), r#"{"input":""}"#);
    }

    #[test]
    fn test_parse_response() {
        let list = parse_response(r#"{"suggestions":["hello","help","helmet"]}"#).unwrap();
        assert_eq!(list, vec!["hello", "help", "helmet"]);

        let empty = parse_response(r#"{"suggestions":[]}"#).unwrap();
        assert!(empty.is_empty());

        // extra fields are tolerated
        let list = parse_response(r#"{"suggestions":["a"],"took_ms":3}"#).unwrap();
        assert_eq!(list, vec!["a"]);
    }

    #[test]
    fn test_parse_response_malformed() {
        assert!(matches!(
            parse_response("not json"),
            Err(SuggestError::Decode(_))
        ));
        assert!(matches!(
            parse_response(r#"{"items":["a"]}"#),
            Err(SuggestError::Decode(_))
        ));
        assert!(matches!(
            parse_response(r#"{"suggestions":"a"}"#),
            Err(SuggestError::Decode(_))
        ));
    }

    #[test]
    fn test_http_requester_needs_base_url() {
        let cfg = SuggestConfig::default();
        assert!(matches!(
            HttpRequester::new(&cfg),
            Err(SuggestError::NotConfigured)
        ));

        let cfg = SuggestConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_ms: 100,
        };
        let http = HttpRequester::new(&cfg).unwrap();
        assert_eq!(http.endpoint(), "http://127.0.0.1:9/suggest");
    }

    #[test]
    fn test_closure_requester() {
        let r = |input: &str| -> Result<Vec<String>, SuggestError> {
            Ok(vec![input.to_uppercase()])
        };
        assert_eq!(r.request("ab").unwrap(), vec!["AB"]);
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = SuggestionWorker::spawn(echo).unwrap();
        worker.submit(1, "he".to_string());
        let reply = worker.recv_timeout(Duration::from_secs(5)).expect("reply");
        assert_eq!(reply.seq, 1);
        assert_eq!(reply.input, "he");
        assert_eq!(reply.outcome.unwrap(), vec!["he-1", "he-2"]);
    }

    #[test]
    fn test_worker_reports_failure() {
        let failing = |_: &str| -> Result<Vec<String>, SuggestError> {
            Err(SuggestError::Http("503".into()))
        };
        let worker = SuggestionWorker::spawn(failing).unwrap();
        worker.submit(7, "x".to_string());
        let reply = worker.recv_timeout(Duration::from_secs(5)).expect("reply");
        assert_eq!(reply.seq, 7);
        assert!(matches!(reply.outcome, Err(SuggestError::Http(_))));
    }

    #[test]
    fn test_error_messages_name_the_direction() {
        let json_err = || serde_json::from_str::<u32>("x").unwrap_err();
        assert!(SuggestError::Encode(json_err())
            .to_string()
            .starts_with("failed to encode suggestion request"));
        assert!(SuggestError::Decode(json_err())
            .to_string()
            .starts_with("malformed suggestion response"));
    }

    #[test]
    fn test_worker_survives_panicking_requester() {
        let flaky = |input: &str| -> Result<Vec<String>, SuggestError> {
            if input == "boom" {
                panic!("requester blew up");
            }
            Ok(vec![input.to_string()])
        };
        let worker = SuggestionWorker::spawn(flaky).unwrap();

        assert!(worker.submit(1, "boom".to_string()));
        let reply = worker.recv_timeout(Duration::from_secs(5)).expect("reply");
        assert_eq!(reply.seq, 1);
        match reply.outcome {
            Err(SuggestError::Panicked(msg)) => assert!(msg.contains("blew up")),
            other => panic!("expected Panicked, got {:?}", other),
        }

        assert!(worker.submit(2, "ok".to_string()));
        let reply = worker.recv_timeout(Duration::from_secs(5)).expect("reply");
        assert_eq!(reply.seq, 2);
        assert_eq!(reply.outcome.unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_unread_replies_do_not_pile_up() {
        let worker = SuggestionWorker::spawn(echo).unwrap();
        for seq in 1..=50 {
            worker.submit(seq, format!("w{}", seq));
            thread::sleep(Duration::from_millis(1));
        }
        // let the last ticket finish
        thread::sleep(Duration::from_millis(100));
        assert!(worker.reply_rx.len() <= 2, "{} replies queued", worker.reply_rx.len());

        let mut last = None;
        while let Some(reply) = worker.try_recv() {
            last = Some(reply.seq);
        }
        assert_eq!(last, Some(50));
    }

    #[test]
    fn test_submit_reports_stopped_worker() {
        let (ticket_tx, ticket_rx) = crossbeam_channel::unbounded();
        let (_reply_tx, reply_rx) = crossbeam_channel::unbounded();
        drop(ticket_rx);
        let worker = SuggestionWorker::from_channels(ticket_tx, reply_rx);
        assert!(!worker.submit(1, "a".to_string()));
    }

    #[test]
    fn test_worker_skips_invalidated_ticket() {
        let worker = SuggestionWorker::spawn(echo).unwrap();
        // #1 may or may not be answered depending on timing, #3 always is.
        worker.submit(1, "a".to_string());
        worker.invalidate(2);
        worker.submit(3, "abc".to_string());

        let mut last = None;
        while let Some(reply) = worker.recv_timeout(Duration::from_millis(500)) {
            assert!(reply.seq == 1 || reply.seq == 3);
            last = Some(reply.seq);
        }
        assert_eq!(last, Some(3));
    }
}
