//! Server-sent-event encoding of stream frames.
//!
//! Each frame serializes to one `data: <JSON>` event. Frames that fail to
//! serialize are dropped rather than aborting the stream; the consumer
//! contract is to ignore unparseable frames.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;

use crate::application::handlers::chat::{FrameReceiver, StreamFrame};

fn frame_to_event(frame: &StreamFrame) -> Option<Event> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Event::default().data(json)),
        Err(err) => {
            tracing::warn!(error = %err, "dropping unserializable stream frame");
            None
        }
    }
}

/// Adapts a frame receiver into an SSE response.
pub fn sse_response(
    rx: FrameReceiver,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Some(frame) => {
                    if let Some(event) = frame_to_event(&frame) {
                        return Some((Ok(event), rx));
                    }
                    // Unserializable frame dropped; keep reading.
                }
                None => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::chat::StreamMetrics;

    #[test]
    fn frames_encode_as_data_events() {
        let event = frame_to_event(&StreamFrame::content("merhaba")).unwrap();
        let rendered = format!("{event:?}");
        assert!(rendered.contains("merhaba"));
    }

    #[test]
    fn terminal_frames_encode_metrics() {
        let frame = StreamFrame::end(
            StreamMetrics {
                first_token_seconds: 0.2,
                total_seconds: 1.0,
            },
            false,
        );
        assert!(frame_to_event(&frame).is_some());
    }
}
