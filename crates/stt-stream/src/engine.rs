mod dispatcher;
mod error;
mod session;

pub use dispatcher::{Dispatcher, PoolStats};
pub use error::SessionError;
pub use session::{Session, SessionContext, SessionOutcome, SessionPhase, SessionState};
