//! A minimal client driving the engine over a real TUN device:
//! connects, writes one line, reads the echo back, then closes.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use tcp_engine::{BufferStore, ClockIssGenerator, Config, Dual, Engine, TunTransport};

fn main() {
    env_logger::init();

    let local_addr = Ipv4Addr::from_str("10.10.10.11").unwrap();
    let transport = TunTransport::new(
        "tun1",
        local_addr,
        Ipv4Addr::from_str("255.255.255.0").unwrap(),
    )
    .expect("bring up tun1 (requires CAP_NET_ADMIN)");

    let mut engine = Engine::new(
        transport,
        ClockIssGenerator::new(),
        BufferStore::new(64),
        Config::new(),
    );

    let local = Dual {
        addr: local_addr,
        port: 34343,
    };
    let remote = Dual {
        addr: Ipv4Addr::from_str("10.10.10.10").unwrap(),
        port: 9090,
    };

    println!(">>> connecting to {remote:?}...");
    let quad = engine.connect(local, remote).expect("active open");

    while !engine.is_connected(quad) {
        engine.poll();
        thread::sleep(Duration::from_millis(4));
    }
    println!(">>> connected!");

    engine.write(quad, b"hello from client\n", true).unwrap();

    let mut buf = [0u8; 1500];
    loop {
        engine.poll();
        match engine.read(quad, &mut buf) {
            Ok(0) => {}
            Ok(n) => {
                println!(">>> echoed back: {:?}", String::from_utf8_lossy(&buf[..n]));
                break;
            }
            Err(_) => break,
        }
        thread::sleep(Duration::from_millis(4));
    }

    engine.close(quad).ok();
    while engine.is_state(quad, "TIME-WAIT") {
        engine.poll();
        thread::sleep(Duration::from_millis(4));
    }
}
