use fleetdesk_api::{ApiError, ErrorKind};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("nothing to update for {entity} {id}")]
    EmptyUpdate { entity: &'static str, id: String },
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(err) => err.kind(),
            Self::EmptyUpdate { .. } => ErrorKind::Local,
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Api(err) if err.requires_login())
    }
}
