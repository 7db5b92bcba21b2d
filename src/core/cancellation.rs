use tokio::sync::watch;

/// Cancels every [`Cancellation`] handed out by it.
pub struct Canceller(watch::Sender<bool>);

impl Canceller {
    pub fn new() -> Self {
        Self(watch::Sender::new(false))
    }

    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn token(&self) -> Cancellation {
        Cancellation(self.0.subscribe())
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Cancellation {
    /// Token that is never cancelled.
    pub fn never() -> Self {
        Canceller::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled, never if the canceller is gone without cancelling.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|is_cancelled| *is_cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
