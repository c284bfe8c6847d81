use super::{TurnCredentialIssuer, TurnCredentials};
use crate::errors::RelayError;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Buffered credentials per subscriber; a slow reader only ever needs the
/// newest one, so the buffer stays small.
const SUBSCRIPTION_BUFFER: usize = 4;

/// Long-lived credential feed for one subscriber.
///
/// Issues immediately on creation, then re-issues at the midpoint of the
/// validity window so the subscriber always holds a credential with at
/// least half its window remaining. Issuance errors are pushed to the
/// subscriber and the loop reschedules itself. The background task stops
/// when the subscription is dropped or the receiver goes away.
pub struct TurnSubscription {
    receiver: mpsc::Receiver<Result<TurnCredentials, RelayError>>,
    cancel: CancellationToken,
}

impl TurnSubscription {
    pub fn spawn(issuer: Arc<TurnCredentialIssuer>, client_address: Option<String>) -> Self {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        tokio::spawn(refresh_loop(
            issuer,
            client_address,
            sender,
            cancel.clone(),
        ));
        Self { receiver, cancel }
    }

    /// Next credential (or issuance error). `None` once the feed stops.
    pub async fn recv(&mut self) -> Option<Result<TurnCredentials, RelayError>> {
        self.receiver.recv().await
    }
}

impl Drop for TurnSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Stream view for SSE handlers; dropping the stream cancels the
/// refresh loop through the `Drop` impl.
impl Stream for TurnSubscription {
    type Item = Result<TurnCredentials, RelayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

async fn refresh_loop(
    issuer: Arc<TurnCredentialIssuer>,
    client_address: Option<String>,
    sender: mpsc::Sender<Result<TurnCredentials, RelayError>>,
    cancel: CancellationToken,
) {
    // Refresh at half the validity window, never more often than once a
    // second.
    let interval = Duration::from_secs((issuer.expire_seconds() / 2).max(1));

    loop {
        let issued = issuer.issue(client_address.clone());
        if let Err(error) = &issued {
            warn!(
                target: "relay.turn",
                %error,
                "Credential issuance failed, retrying next cycle"
            );
        }
        if sender.send(issued).await.is_err() {
            debug!(target: "relay.turn", "Subscriber gone, stopping credential refresh");
            return;
        }

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(target: "relay.turn", "Credential refresh cancelled");
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}
