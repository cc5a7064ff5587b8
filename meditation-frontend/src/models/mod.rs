pub mod audio;
pub mod generation;
pub mod search;
pub mod session;
pub mod user;

pub use audio::{AudioSource, SpeechParams, VoiceGender};
pub use generation::GeneratedMeditation;
pub use search::{MatchInfo, SearchResult};
pub use session::{SessionId, SessionRecord};
pub use user::{AuthContext, AuthUser, UiPreferences};
