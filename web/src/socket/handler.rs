use crate::socket::session::SocketSession;
use axum::extract::ws::{Message as Frame, WebSocket};
use fanout::{Connection, Manager};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Runs an upgraded socket until it closes.
///
/// The socket is split: broadcasts reach the client through the connection's
/// bounded queue, drained by a writer task, while this task runs the session's
/// read loop. When the loop ends the connection is unregistered, which queues
/// a close frame and drops the queue, so the writer finishes on its own. When
/// the writer stops first (write failure or eviction) the read loop is
/// abandoned.
pub(crate) async fn serve(
    socket: WebSocket,
    manager: Arc<Manager>,
    topic: String,
    session: SocketSession,
) {
    let (sink, stream) = socket.split();
    let (connection, rx) = Connection::channel();

    let connection_id = manager.register_connection(&topic, connection);
    let mut writer = tokio::spawn(writer_task(sink, rx));

    let writer_result = tokio::select! {
        _ = session.run(stream) => {
            manager.unregister_connection(&topic, &connection_id);
            writer.await
        }
        result = &mut writer => {
            debug!(
                "Writer for connection {} stopped, ending its session",
                connection_id.as_str()
            );
            session.cancel();
            manager.unregister_connection(&topic, &connection_id);
            result
        }
    };

    if let Err(e) = writer_result {
        warn!(
            "Writer task for connection {} ended abnormally: {e}",
            connection_id.as_str()
        );
    }
    debug!("Socket connection {} closed", connection_id.as_str());
}

async fn writer_task(mut sink: SplitSink<WebSocket, Frame>, mut rx: mpsc::Receiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        let closing = matches!(frame, Frame::Close(_));
        if let Err(e) = sink.send(frame).await {
            // Dropping rx makes the next broadcast evict this connection
            debug!("Socket write failed: {e}");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}
