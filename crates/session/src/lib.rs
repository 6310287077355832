pub mod error;
pub mod probe;
pub mod refresh;
pub mod session;

pub use error::{FailureKind, PlaybackError, ProbeError};
pub use probe::SourceProbe;
pub use refresh::RefreshCycle;
pub use session::{PlaybackSession, SessionConfig};
