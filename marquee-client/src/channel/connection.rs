use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ChannelAvailability;
use super::dispatch::EventDispatcher;
use super::envelope::decode_envelope;

const MAX_BACKOFF_SECS: u64 = 30;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Where and whether to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub url: String,
    /// When false the channel is never attached (degraded mode).
    pub insecure_channel_allowed: bool,
    /// Consecutive failed attempts before the adapter gives up.
    pub max_retries: u32,
}

/// Delay before reconnect attempt `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(63);
    let secs = 2u64.checked_pow(exp).unwrap_or(u64::MAX);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

/// Why [`pump_events`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEnd {
    Cancelled,
    Disconnected,
}

/// Read frames from `source` and dispatch each envelope in arrival order
/// until the stream ends or `cancel` fires.
///
/// Cancellation wins over both pending reads and an in-flight dispatch, so
/// nothing is applied to the registry after the token is cancelled.
pub async fn pump_events<S>(
    mut source: S,
    dispatcher: &EventDispatcher,
    cancel: &CancellationToken,
) -> PumpEnd
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PumpEnd::Cancelled,
            frame = source.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "library channel closed by server");
                return PumpEnd::Disconnected;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                warn!(error = %err, "library channel read failed");
                return PumpEnd::Disconnected;
            }
            None => return PumpEnd::Disconnected,
        };

        let event = match decode_envelope(&text) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "skipping undecodable library envelope");
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PumpEnd::Cancelled,
            outcome = dispatcher.dispatch(event) => {
                debug!(?outcome, "library event dispatched");
            }
        }
    }
}

/// Owner of a running channel task. Dropping the handle stops the task;
/// [`ChannelHandle::close`] additionally waits for the socket to close.
#[derive(Debug)]
pub struct ChannelHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Spawn the connection task, or return `None` in degraded mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        settings: &ChannelSettings,
        dispatcher: EventDispatcher,
        availability: ChannelAvailability,
    ) -> Option<Self> {
        if !settings.insecure_channel_allowed {
            info!(
                url = %settings.url,
                "event channel disabled; library list refreshes on fetch only"
            );
            availability.set_live(false);
            return None;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_channel(
            settings.clone(),
            dispatcher,
            availability,
            cancel.clone(),
        ));

        Some(Self {
            cancel,
            task: Some(task),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop listening, then close the socket.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
            && err.is_panic()
        {
            warn!(error = %err, "library channel task panicked");
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_channel(
    settings: ChannelSettings,
    dispatcher: EventDispatcher,
    availability: ChannelAvailability,
    cancel: CancellationToken,
) {
    let url = settings.url;
    let mut failures: u32 = 0;

    loop {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                failures = 0;
                availability.set_live(true);
                info!(%url, "library event channel connected");

                let (mut sink, source) = stream.split();
                let end = pump_events(source, &dispatcher, &cancel).await;
                availability.set_live(false);

                if end == PumpEnd::Cancelled {
                    // The listener has already stopped; now the socket.
                    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close())
                        .await
                    {
                        Ok(Ok(())) => debug!("library event channel closed"),
                        Ok(Err(err)) => {
                            debug!(error = %err, "library channel close failed")
                        }
                        Err(_) => debug!("library channel close timed out"),
                    }
                    break;
                }
                warn!(%url, "library event channel disconnected");
            }
            Err(err) => {
                warn!(%url, error = %err, "library event channel connect failed");
            }
        }

        failures += 1;
        if failures > settings.max_retries {
            warn!(
                %url,
                attempts = failures,
                "giving up on library event channel"
            );
            break;
        }

        let delay = backoff_delay(failures);
        info!(
            attempt = failures,
            delay_secs = delay.as_secs(),
            "reconnecting library event channel"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    availability.set_live(false);
}
