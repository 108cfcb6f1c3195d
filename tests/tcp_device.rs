//! End-to-end test against a fake core listening on a real socket

use qrc_bridge::adapter::TcpConnection;
use qrc_bridge::{Adapter, AdapterConfig};
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Serve one client: answer each request, preceded by a heartbeat.
fn serve(stream: TcpStream) -> Vec<Value> {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;
    let mut requests = Vec::new();

    loop {
        let mut frame = Vec::new();
        if reader.read_until(0, &mut frame).unwrap() == 0 {
            break;
        }
        frame.pop();
        let request: Value = serde_json::from_slice(&frame).unwrap();

        let result = match request["method"].as_str().unwrap() {
            "Control.Get" => json!([{"Name": request["params"][0], "Position": 0.5, "Value": 1}]),
            _ => json!(true),
        };

        let heartbeat = json!({"jsonrpc": "2.0", "method": "EngineStatus", "params": {"State": "Active"}});
        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": result});
        for message in [heartbeat, reply] {
            writer.write_all(message.to_string().as_bytes()).unwrap();
            writer.write_all(&[0]).unwrap();
        }
        writer.flush().unwrap();

        requests.push(request);
    }

    requests
}

#[test]
fn adapter_round_trips_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let device = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream)
    });

    let config = AdapterConfig {
        port,
        read_timeout_ms: Some(5_000),
        connect_timeout_ms: Some(5_000),
        ..AdapterConfig::default()
    };
    let connection = TcpConnection::connect(config.address().as_str(), config.socket_timeouts()).unwrap();
    let mut adapter = Adapter::new(config.address(), connection, &config);

    let volume = adapter.get("volume", "room.gain");
    assert_eq!(volume.value, "50");
    assert!(volume.diagnostics.is_empty(), "{:?}", volume.diagnostics);

    let mute = adapter.set("audiomute", "room.mute", "true");
    assert_eq!(mute.value, "ok");
    assert!(mute.diagnostics.is_empty());

    drop(adapter);
    let requests = device.join().unwrap();

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["method"], "Control.Get");
    assert_eq!(requests[1]["method"], "Control.Set");
    assert_eq!(requests[1]["params"], json!({"Name": "room.mute", "Value": 1}));
}

#[test]
fn connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let timeouts = AdapterConfig {
        connect_timeout_ms: Some(500),
        ..AdapterConfig::default()
    }
    .socket_timeouts();
    assert_eq!(timeouts.connect, Some(Duration::from_millis(500)));
    assert!(TcpConnection::connect(addr, timeouts).is_err());
}
