pub mod chord_engine;
pub mod config;
pub mod dot_table;
pub mod key_map;
pub mod session;
pub mod suggest;
pub mod types;
pub mod word_buffer;

pub use chord_engine::{ChordEngine, ChordPhase, Decision, KeyEdge, KeyEvent};
pub use config::{ConfigError, Profile, SuggestConfig};
pub use dot_table::DotPatternTable;
pub use key_map::KeyToDotMap;
pub use session::{ReplyStatus, Session, Snapshot};
pub use suggest::{HttpRequester, SuggestError, SuggestionRequester, SuggestionWorker};
pub use types::{DotIndex, DotPattern, KeyAction};
