//! Server start errors.

use hydyco_protocol::{LifecycleError, PreconditionError};
use hydyco_transport::ListenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Listen(#[from] ListenError),
}
