use casewatch_core::{CaseId, PollStop, ViewState};
use tokio::sync::mpsc;

use crate::PollEvent;

/// Receives what a poll session learns. Called from the session's task.
pub trait PollObserver: Send + Sync {
    fn on_update(&self, case_id: &CaseId, view: &ViewState);

    /// Called exactly once per session.
    fn on_stop(&self, stop: &PollStop);
}

/// Forwards every callback as a [`PollEvent`] on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<PollEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PollObserver for ChannelObserver {
    fn on_update(&self, case_id: &CaseId, view: &ViewState) {
        let _ = self.tx.send(PollEvent::Updated {
            case_id: case_id.clone(),
            view: view.clone(),
        });
    }

    fn on_stop(&self, stop: &PollStop) {
        let _ = self.tx.send(PollEvent::Stopped(stop.clone()));
    }
}

/// Adapts a pair of closures into an observer.
pub struct CallbackObserver<U, S> {
    on_update: U,
    on_stop: S,
}

impl<U, S> CallbackObserver<U, S>
where
    U: Fn(&CaseId, &ViewState) + Send + Sync,
    S: Fn(&PollStop) + Send + Sync,
{
    pub fn new(on_update: U, on_stop: S) -> Self {
        Self { on_update, on_stop }
    }
}

impl<U, S> PollObserver for CallbackObserver<U, S>
where
    U: Fn(&CaseId, &ViewState) + Send + Sync,
    S: Fn(&PollStop) + Send + Sync,
{
    fn on_update(&self, case_id: &CaseId, view: &ViewState) {
        (self.on_update)(case_id, view);
    }

    fn on_stop(&self, stop: &PollStop) {
        (self.on_stop)(stop);
    }
}
