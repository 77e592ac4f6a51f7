use std::time::Duration;

use ether_call::{CallClient, CallReply, CallRequest, CallServer};
use ether_data::Value;
use ether_runtime::{Channel, ClientCom, Root, ServerCom};

async fn start_relay() -> std::net::SocketAddr {
    let root = Root::new();
    let server = ServerCom::new(&root);
    server.bind("127.0.0.1:0", None, &root).await.unwrap()
}

#[tokio::test]
async fn call_with_return() {
    let addr = start_relay().await;
    let channel = Channel::random();
    let url = format!("ws://{addr}");

    let server = CallServer::connect(&url, channel, "svc").await.unwrap();
    server.register("add", |args| {
        let a_val = match args.get("a") {
            Some(Value::Int(n)) => *n,
            _ => 0,
        };
        let b_val = match args.get("b") {
            Some(Value::Int(n)) => *n,
            _ => 0,
        };
        Ok(vec![Value::Int(a_val + b_val)])
    });
    server.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = CallClient::connect(&url, channel).await.unwrap();
    let mut ret = client
        .call("svc", "add", Value::map([("a", Value::Int(2)), ("b", Value::Int(3))]), false, false)
        .await;
    let values = ret.capture().unwrap();
    assert_eq!(values, vec![Value::Int(5)]);
}

#[tokio::test]
async fn call_raises_surfaces_typed_error() {
    let addr = start_relay().await;
    let channel = Channel::random();
    let url = format!("ws://{addr}");

    let server = CallServer::connect(&url, channel, "svc").await.unwrap();
    server.register("boom", |_args| Err(ether_call::CallError::new("ValueError", "bad")));
    server.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = CallClient::connect(&url, channel).await.unwrap();
    let mut ret = client.call("svc", "boom", Value::map([]), false, false).await;
    let err = ret.capture().unwrap_err();
    assert!(err.to_string().contains("ValueError"));
    assert!(err.to_string().contains("bad"));
}

#[tokio::test]
async fn batched_call_preserves_order() {
    let addr = start_relay().await;
    let channel = Channel::random();
    let url = format!("ws://{addr}");

    let server = CallServer::connect(&url, channel, "svc").await.unwrap();
    server.register("f1", |_| Ok(vec![Value::Int(1)]));
    server.register("f2", |_| Ok(vec![Value::Int(2)]));
    server.register("f3", |_| Ok(vec![Value::Int(3)]));
    server.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = CallClient::connect(&url, channel).await.unwrap();
    client.call("svc", "f1", Value::map([]), false, true).await;
    client.call("svc", "f2", Value::map([]), false, true).await;
    let mut ret = client.call("svc", "f3", Value::map([]), false, false).await;

    assert_eq!(ret.capture().unwrap(), vec![Value::Int(1)]);
    assert_eq!(ret.capture().unwrap(), vec![Value::Int(2)]);
    assert_eq!(ret.capture().unwrap(), vec![Value::Int(3)]);
}

#[tokio::test]
async fn duplicate_msg_id_executes_once() {
    let addr = start_relay().await;
    let channel = Channel::random();
    let url = format!("ws://{addr}");

    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let server = CallServer::connect(&url, channel, "svc").await.unwrap();
    let counter = calls.clone();
    server.register("count", move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(vec![])
    });
    server.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = CallClient::connect(&url, channel).await.unwrap();
    let mut first = client.call("svc", "count", Value::map([]), false, false).await;
    first.capture().unwrap();

    // A genuinely fresh call reuses the transport but not the msg_id, so
    // we can't resend the exact same request through the public API; the
    // server-side dedup unit test in bound_set.rs covers the underlying
    // mechanism directly. Here we confirm a single call executes exactly
    // once.
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resend_of_dropped_reply_still_produces_a_reply_without_re_executing() {
    let addr = start_relay().await;
    let channel = Channel::random();
    let url = format!("ws://{addr}");

    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let server = CallServer::connect(&url, channel, "svc").await.unwrap();
    let counter = calls.clone();
    server.register("count", move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(vec![Value::Int(1)])
    });
    server.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Drive the raw request/reply protocol directly (bypassing CallClient's
    // resend loop) so the same msg_id can be injected twice, simulating the
    // client's first reply having been lost in flight.
    let root = Root::new();
    ClientCom::connect(&url, channel, &root).await.unwrap();

    let request = CallRequest {
        msg_id: [42; 16],
        service: "svc".into(),
        no_ret: false,
        calls: vec![("count".into(), Value::map([]))],
    };

    root.send(channel, request.to_value());
    let (_, first_reply) = root.recv(Some(Duration::from_secs(2))).await.expect("first reply arrives");
    let first_reply = CallReply::from_value(&first_reply).expect("well-formed reply");
    assert_eq!(first_reply.msg_id, [42; 16]);
    assert_eq!(first_reply.rets, vec![(true, vec![Value::Int(1)])]);

    // Resend the identical request (same msg_id): the server must not
    // re-execute "count", but must still answer with the cached reply.
    root.send(channel, request.to_value());
    let (_, second_reply) = root.recv(Some(Duration::from_secs(2))).await.expect("resend still produces a reply");
    let second_reply = CallReply::from_value(&second_reply).expect("well-formed reply");
    assert_eq!(second_reply, first_reply);

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1, "duplicate must not re-execute the call");
}
