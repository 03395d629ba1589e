use crate::chord_engine::{ChordEngine, ChordPhase, Decision, KeyEdge, KeyEvent};
use crate::config::{ConfigError, Profile};
use crate::dot_table::DotPatternTable;
use crate::key_map::{normalize_key, KeyToDotMap};
use crate::suggest::{SuggestError, SuggestionReply, SuggestionRequester, SuggestionWorker};
use crate::types::{DotPattern, KeyAction};
use crate::word_buffer::WordBuffer;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use crate::key_map::BACKSPACE_KEY;

/// Read-only view handed to whatever renders the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub word: String,
    /// Pattern keys, one per character of `word`.
    pub history: Vec<String>,
    /// The same patterns as Unicode Braille cells.
    pub cells: String,
    pub suggestions: Vec<String>,
}

/// What happened to a suggestion reply handed to [`Session::apply_reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// Suggestions replaced.
    Applied,
    /// Reply was current but the request failed; suggestions kept.
    Failed,
    /// Reply belongs to a superseded request; dropped.
    Stale,
}

/// One typing session: the open chord, the word with its patterns, and the
/// suggestions for it.
///
/// All state changes happen through `&mut self`; suggestion lookups run on
/// the worker thread and come back through [`Session::poll_suggestions`].
pub struct Session {
    chord_engine: ChordEngine,
    buffer: WordBuffer,
    suggestions: Vec<String>,
    /// Sequence number of the newest request (or clear).
    seq: u64,
    /// A request for `seq` is in flight.
    awaiting: bool,
    worker: Option<SuggestionWorker>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(KeyToDotMap::default(), DotPatternTable::default())
    }
}

impl Session {
    pub fn new(key_map: KeyToDotMap, table: DotPatternTable) -> Self {
        Self {
            chord_engine: ChordEngine::new(key_map, table),
            buffer: WordBuffer::new(),
            suggestions: Vec::new(),
            seq: 0,
            awaiting: false,
            worker: None,
        }
    }

    pub fn from_profile(profile: &Profile) -> Result<Self, ConfigError> {
        let key_map = profile.validated_key_map()?;
        info!("Session: {} chord keys mapped.", key_map.len());
        Ok(Self::new(key_map, DotPatternTable::default()))
    }

    pub fn with_worker(mut self, worker: SuggestionWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Spawns a worker around `requester` and attaches it.
    pub fn with_requester<R: SuggestionRequester>(
        self,
        requester: R,
    ) -> Result<Self, SuggestError> {
        let worker = SuggestionWorker::spawn(requester)?;
        Ok(self.with_worker(worker))
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: &KeyEvent) -> KeyAction {
        match event.edge {
            KeyEdge::Down => self.on_key_down(&event.key),
            KeyEdge::Up => self.on_key_up(&event.key),
        }
    }

    pub fn on_key_down(&mut self, raw: &str) -> KeyAction {
        if normalize_key(raw) == BACKSPACE_KEY {
            return self.backspace();
        }

        match self.chord_engine.press(raw) {
            Decision::Passthrough(_) => KeyAction::Pass,
            _ => KeyAction::Block,
        }
    }

    pub fn on_key_up(&mut self, raw: &str) -> KeyAction {
        match self.chord_engine.release(raw) {
            Decision::Passthrough(_) => KeyAction::Pass,
            Decision::Chord { ch, pattern } => {
                self.append(ch, pattern);
                KeyAction::Commit(ch)
            }
            Decision::Unrecognized(_) | Decision::Pending | Decision::Ignored => KeyAction::Block,
        }
    }

    // -----------------------------------------------------------------------
    // Word editing
    // -----------------------------------------------------------------------

    fn append(&mut self, ch: char, pattern: DotPattern) {
        self.buffer.append(ch, pattern);
        debug!("Word: {:?}", self.buffer.word());
        self.request_suggestions();
    }

    pub fn backspace(&mut self) -> KeyAction {
        match self.buffer.backspace() {
            Some((ch, pattern)) => {
                debug!("Erased {:?} ({}), word: {:?}", ch, pattern, self.buffer.word());
                self.request_suggestions();
                KeyAction::Erase(ch)
            }
            None => KeyAction::Block,
        }
    }

    /// Empties the word, its patterns and the suggestions. No request is
    /// issued and any request still in flight becomes stale.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.suggestions.clear();
        self.seq += 1;
        self.awaiting = false;
        if let Some(ref worker) = self.worker {
            worker.invalidate(self.seq);
        }
        debug!("Session cleared (seq={})", self.seq);
    }

    // -----------------------------------------------------------------------
    // Suggestions
    // -----------------------------------------------------------------------

    fn request_suggestions(&mut self) {
        self.seq += 1;
        self.awaiting = match self.worker {
            Some(ref worker) => worker.submit(self.seq, self.buffer.word().to_string()),
            None => false,
        };
    }

    /// Applies a reply if it answers the newest request.
    pub fn apply_reply(&mut self, reply: SuggestionReply) -> ReplyStatus {
        if reply.seq != self.seq {
            debug!(
                "Dropping stale suggestions for {:?} (#{}, current #{})",
                reply.input, reply.seq, self.seq
            );
            return ReplyStatus::Stale;
        }

        self.awaiting = false;
        match reply.outcome {
            Ok(list) => {
                debug!("{} suggestions for {:?}", list.len(), reply.input);
                self.suggestions = list;
                ReplyStatus::Applied
            }
            Err(e) => {
                warn!("Suggestion request for {:?} failed: {}", reply.input, e);
                ReplyStatus::Failed
            }
        }
    }

    /// Applies every reply that has already arrived. Returns how many
    /// replaced the suggestions.
    pub fn poll_suggestions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(reply) = self.worker.as_ref().and_then(SuggestionWorker::try_recv) {
            if self.apply_reply(reply) == ReplyStatus::Applied {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks until the newest request has been answered or `timeout`
    /// elapses. Returns `true` when nothing is left in flight.
    pub fn wait_for_suggestions(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.awaiting {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(reply) = self
                .worker
                .as_ref()
                .and_then(|w| w.recv_timeout(remaining))
            else {
                break;
            };
            self.apply_reply(reply);
        }
        !self.awaiting
    }

    pub fn is_awaiting_suggestions(&self) -> bool {
        self.awaiting
    }

    /// Sequence number of the newest request or clear.
    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn word(&self) -> &str {
        self.buffer.word()
    }

    pub fn history(&self) -> &[DotPattern] {
        self.buffer.history()
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn phase(&self) -> ChordPhase {
        self.chord_engine.phase()
    }

    pub fn held_keys(&self) -> usize {
        self.chord_engine.state.pressed.len()
    }

    pub fn key_map(&self) -> &KeyToDotMap {
        self.chord_engine.key_map()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            word: self.buffer.word().to_string(),
            history: self.buffer.history_keys(),
            cells: self
                .buffer
                .history()
                .iter()
                .map(|p| p.to_braille_char())
                .collect(),
            suggestions: self.suggestions.clone(),
        }
    }
}
