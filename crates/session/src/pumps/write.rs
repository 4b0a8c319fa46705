//! WebSocket write pump. Serialises outbound messages in queue order.

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

/// Writes queued messages to the WebSocket.
///
/// A queued close frame is written and ends the pump. If the queue closes
/// or `cancel` fires first, a close frame is written on the way out.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                match msg {
                    Some(m) => {
                        let is_close = matches!(m, tungstenite::Message::Close(_));
                        if let Err(e) = write.send(m).await {
                            error!("WebSocket write error: {e}");
                            return;
                        }
                        if is_close {
                            trace!("close frame written");
                            return;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink;

    fn channel_sink(
        tx: mpsc::Sender<tungstenite::Message>,
    ) -> impl Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin {
        Box::pin(sink::unfold(tx, |tx, msg: tungstenite::Message| async move {
            let _ = tx.send(msg).await;
            Ok::<_, tungstenite::Error>(tx)
        }))
    }

    #[tokio::test]
    async fn write_pump_stops_on_cancel() {
        let (sink_tx, mut sink_rx) = mpsc::channel::<tungstenite::Message>(16);
        let cancel = CancellationToken::new();

        let (_write_tx, write_rx) = mpsc::channel(16);
        let c = cancel.clone();
        let handle = tokio::spawn(async move {
            write_pump(channel_sink(sink_tx), write_rx, c).await;
        });

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");

        let close_msg = sink_rx.recv().await;
        assert!(matches!(close_msg, Some(tungstenite::Message::Close(_))));
    }

    #[tokio::test]
    async fn write_pump_flushes_in_order_and_closes_once() {
        let (sink_tx, mut sink_rx) = mpsc::channel::<tungstenite::Message>(16);
        let (write_tx, write_rx) = mpsc::channel(16);

        write_tx
            .send(tungstenite::Message::Text("one".into()))
            .await
            .unwrap();
        write_tx
            .send(tungstenite::Message::Text("two".into()))
            .await
            .unwrap();
        write_tx.send(tungstenite::Message::Close(None)).await.unwrap();

        write_pump(channel_sink(sink_tx), write_rx, CancellationToken::new()).await;

        let mut written = Vec::new();
        while let Some(msg) = sink_rx.recv().await {
            written.push(msg);
        }
        assert_eq!(written.len(), 3);
        assert_eq!(written[0], tungstenite::Message::Text("one".into()));
        assert_eq!(written[1], tungstenite::Message::Text("two".into()));
        assert!(matches!(written[2], tungstenite::Message::Close(_)));
    }

    #[tokio::test]
    async fn write_pump_closes_when_queue_drops() {
        let (sink_tx, mut sink_rx) = mpsc::channel::<tungstenite::Message>(16);
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(16);
        drop(write_tx);

        write_pump(channel_sink(sink_tx), write_rx, CancellationToken::new()).await;

        assert!(matches!(
            sink_rx.recv().await,
            Some(tungstenite::Message::Close(_))
        ));
        assert!(sink_rx.recv().await.is_none());
    }
}
