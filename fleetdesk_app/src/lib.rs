mod error;
mod session;
mod state;

pub use error::{AppError, AppResult};
pub use session::FleetSession;
pub use state::{Entity, MirrorStatus, StateMirror};
