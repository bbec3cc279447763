use futures::channel::mpsc::UnboundedSender;
use log::debug;
use types::primitives::Epoch;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FinalityToSummarizer {
    FinalityUpdated(Epoch),
    Stop,
}

impl FinalityToSummarizer {
    pub fn send(self, tx: &UnboundedSender<Self>) {
        if tx.unbounded_send(self).is_err() {
            debug!("send to summarizer failed because the receiver was dropped");
        }
    }
}
