//! A minimal echo server driving the engine over a real TUN device.
//! Demonstrates the event-driven API end to end: bind, accept via
//! `on_connect`, and read/write from the poll loop.

use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use tcp_engine::{BufferStore, ClockIssGenerator, Config, Dual, Engine, TunTransport};

fn main() {
    env_logger::init();

    let local_addr = Ipv4Addr::from_str("10.10.10.10").unwrap();
    let transport = TunTransport::new(
        "tun0",
        local_addr,
        Ipv4Addr::from_str("255.255.255.0").unwrap(),
    )
    .expect("bring up tun0 (requires CAP_NET_ADMIN)");

    let mut engine = Engine::new(
        transport,
        ClockIssGenerator::new(),
        BufferStore::new(64),
        Config::new(),
    );

    let local = Dual {
        addr: local_addr,
        port: 9090,
    };
    engine.bind(local).expect("bind 9090");

    let accepted: Rc<RefCell<Vec<tcp_engine::Quad>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let accepted = accepted.clone();
        engine
            .set_on_connect(local, move |quad| {
                println!(">>> accepted connection from {:?}", quad.remote);
                accepted.borrow_mut().push(quad);
            })
            .expect("listener exists");
    }

    println!(">>> waiting for incoming connections on port 9090...");
    loop {
        engine.poll();

        let quads: Vec<_> = accepted.borrow().clone();
        for quad in quads {
            let mut buf = [0u8; 1500];
            match engine.read(quad, &mut buf) {
                Ok(0) | Err(_) => {}
                Ok(n) => {
                    println!(">>> echoing {n} bytes back to {:?}", quad.remote);
                    let _ = engine.write(quad, &buf[..n], true);
                }
            }
        }

        thread::sleep(Duration::from_millis(4));
    }
}
