use std::time::Duration;

use ether_data::Value;
use ether_runtime::{Channel, Root, ServerCom};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

async fn connect(addr: std::net::SocketAddr, channel: Channel) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
    let url = format!("ws://{addr}");
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.expect("connect");
    ws.send(Message::Text(channel.to_hex().into())).await.expect("send hello");
    ws
}

async fn send_json(ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, value: &Value) {
    let text = ether_data::JsonX::dump(value).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn recv_json(ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>) -> Value {
    loop {
        match ws.next().await.expect("stream ended").expect("ws error") {
            Message::Text(text) => return ether_data::JsonX::load(&text).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn three_peers_same_channel_see_each_others_messages() {
    let root = Root::new();
    let server = ServerCom::new(&root);
    let addr = server.bind("127.0.0.1:0", None, &root).await.unwrap();

    let channel = Channel::random();
    let other_channel = Channel::random();

    let mut a = connect(addr, channel).await;
    let mut b = connect(addr, channel).await;
    let mut c = connect(addr, channel).await;
    let mut outsider = connect(addr, other_channel).await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = Value::map([("hello", Value::str("world"))]);
    send_json(&mut a, &payload).await;

    let got_b = tokio::time::timeout(Duration::from_secs(2), recv_json(&mut b)).await.unwrap();
    let got_c = tokio::time::timeout(Duration::from_secs(2), recv_json(&mut c)).await.unwrap();
    assert_eq!(got_b, payload);
    assert_eq!(got_c, payload);

    let marker = Value::map([("marker", Value::str("for-outsider-check"))]);
    send_json(&mut a, &marker).await;
    let got_b2 = tokio::time::timeout(Duration::from_secs(2), recv_json(&mut b)).await.unwrap();
    assert_eq!(got_b2, marker);

    let outsider_result = tokio::time::timeout(Duration::from_millis(300), recv_json(&mut outsider)).await;
    assert!(outsider_result.is_err(), "peer on a different channel must not receive the message");
}

#[tokio::test]
async fn echo_scenario_two_peers() {
    let root = Root::new();
    let server = ServerCom::new(&root);
    let addr = server.bind("127.0.0.1:0", None, &root).await.unwrap();

    let channel = Channel::new([0u8; 16]);
    let mut client1 = connect(addr, channel).await;
    let mut client2 = connect(addr, channel).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = Value::map([("hello", Value::str("world"))]);
    send_json(&mut client1, &payload).await;
    let got = tokio::time::timeout(Duration::from_secs(2), recv_json(&mut client2)).await.unwrap();
    assert_eq!(got, payload);
}
