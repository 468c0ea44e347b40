//! Integration tests for the WebSocket transport.

#[cfg(feature = "websocket")]
mod websocket {
    use a3zone_transport::{Connection, Transport, WebSocketTransport};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    async fn connect_client(
        addr: &str,
    ) -> tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    > {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_text_frames_flow_both_ways() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server = tokio::spawn(async move { transport.accept().await.expect("accept") });
        let mut client = connect_client(&addr).await;
        let conn = server.await.expect("join");

        client
            .send(Message::Text("{\"command\":\"WHO\"}".into()))
            .await
            .expect("client send");
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, b"{\"command\":\"WHO\"}");

        conn.send(b"{\"command\":\"WHO\",\"payload\":{}}").await.expect("send");
        let reply = client.next().await.expect("msg").expect("ok");
        assert_eq!(reply.into_text().expect("text").as_str(), "{\"command\":\"WHO\",\"payload\":{}}");
    }

    #[tokio::test]
    async fn test_websocket_close_from_client_returns_none() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server = tokio::spawn(async move { transport.accept().await.expect("accept") });
        let mut client = connect_client(&addr).await;
        let conn = server.await.expect("join");

        client.close(None).await.expect("close");
        assert!(conn.recv().await.expect("recv").is_none());
    }
}
