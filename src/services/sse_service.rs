use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::ServerEvent,
    services::display_service::{self, DISPLAY_EVENT},
    state::SharedState,
};

/// Subscribe to the display stream, starting with the current view.
pub fn subscribe_display(state: &SharedState) -> (Option<ServerEvent>, broadcast::Receiver<ServerEvent>) {
    let receiver = state.display_sse().subscribe();
    let view = display_service::current_view(state);
    let initial = match ServerEvent::json(Some(DISPLAY_EVENT.to_string()), &view) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to encode initial display view");
            None
        }
    };
    (initial, receiver)
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects.
pub fn to_sse_stream(
    initial: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Views are full snapshots, so the next one catches the client up.
                            debug!(skipped, "display stream lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("Display SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
