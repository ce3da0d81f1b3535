use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, warn};

use crate::solution::solution::Solution;

/// Receives every published solution. Submitting must never block the
/// optimization path, storage is best effort.
pub trait SolutionSink: Send + Sync {
    fn submit(&self, solution: &Arc<Solution>);
}

/// Forwards solutions to a bounded tokio channel, the consumer decides where
/// they are stored.
pub struct ChannelSolutionSink {
    sender: Sender<Arc<Solution>>,
}

impl ChannelSolutionSink {
    pub fn new(capacity: usize) -> (Self, Receiver<Arc<Solution>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (ChannelSolutionSink { sender }, receiver)
    }
}

impl SolutionSink for ChannelSolutionSink {
    fn submit(&self, solution: &Arc<Solution>) {
        match self.sender.try_send(Arc::clone(solution)) {
            Ok(()) => debug!(version = solution.version(), "Solution submitted"),
            Err(TrySendError::Full(_)) => {
                warn!(version = solution.version(), "Solution sink is full, dropping solution")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(version = solution.version(), "Solution sink is closed, dropping solution")
            }
        }
    }
}
