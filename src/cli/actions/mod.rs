//! Typed actions the parsed command line dispatches to.

pub mod server;

use anyhow::Result;

/// Everything the financeu binary knows how to do.
#[derive(Debug)]
pub enum Action {
    /// Run the HTTP API server.
    Server(Box<server::Args>),
}

impl Action {
    /// Run the selected action to completion.
    ///
    /// # Errors
    /// Propagates the underlying action's failure.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Server(args) => server::execute(*args).await,
        }
    }
}
