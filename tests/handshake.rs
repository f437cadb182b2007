//! Scenario 1 (echo small) plus scenario 4 (active-close
//! introspection) from spec §8: a full three-way handshake, a small
//! write-then-read round trip, and the state-name assertions around
//! an active close.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

use common::{addr, engine, run_to_quiescence, tick, TEST_MSL};
use tcp_engine::Dual;

#[test]
fn three_way_handshake_establishes_both_sides() {
    let mut server = engine(1000, 10);
    let mut client = engine(5000, 10);

    let server_local = Dual {
        addr: addr(1),
        port: 8081,
    };
    server.bind(server_local).unwrap();

    let accepted = Rc::new(RefCell::new(None));
    {
        let accepted = accepted.clone();
        server
            .set_on_connect(server_local, move |quad| *accepted.borrow_mut() = Some(quad))
            .unwrap();
    }

    let client_local = Dual {
        addr: addr(2),
        port: 40000,
    };
    let client_quad = client.connect(client_local, server_local).unwrap();
    assert!(client.is_state(client_quad, "SYN-SENT"));

    run_to_quiescence(&mut server, &mut client);

    assert!(client.is_connected(client_quad));
    let server_quad = accepted.borrow().expect("on_connect fired");
    assert!(server.is_connected(server_quad));
    assert_eq!(server_quad.local, server_local);
    assert_eq!(server_quad.remote, client_local);
}

#[test]
fn echo_small_payload_round_trips() {
    let mut server = engine(10, 10);
    let mut client = engine(20, 10);

    let server_local = Dual {
        addr: addr(1),
        port: 8081,
    };
    server.bind(server_local).unwrap();

    let accepted = Rc::new(RefCell::new(None));
    {
        let accepted = accepted.clone();
        server
            .set_on_connect(server_local, move |quad| *accepted.borrow_mut() = Some(quad))
            .unwrap();
    }

    let client_local = Dual {
        addr: addr(2),
        port: 40001,
    };
    let client_quad = client.connect(client_local, server_local).unwrap();
    run_to_quiescence(&mut server, &mut client);

    let server_quad = accepted.borrow().unwrap();
    let payload = vec![b'x'; 600];
    server.write(server_quad, &payload, true).unwrap();
    run_to_quiescence(&mut server, &mut client);

    let mut buf = [0u8; 4096];
    let n = client.read(client_quad, &mut buf).unwrap();
    assert_eq!(&buf[..n], &payload[..]);

    client.close(client_quad).unwrap();
    run_to_quiescence(&mut server, &mut client);
    server.close(server_quad).ok();
    run_to_quiescence(&mut server, &mut client);

    thread::sleep(TEST_MSL * 3);
    server.poll();
    client.poll();

    assert_eq!(server.active_connections(), 0);
    assert_eq!(client.active_connections(), 0);
}

#[test]
fn active_close_walks_through_fin_wait_states() {
    let mut server = engine(100, 10);
    let mut client = engine(200, 10);

    let server_local = Dual {
        addr: addr(1),
        port: 8082,
    };
    server.bind(server_local).unwrap();
    let accepted = Rc::new(RefCell::new(None));
    {
        let accepted = accepted.clone();
        server
            .set_on_connect(server_local, move |quad| *accepted.borrow_mut() = Some(quad))
            .unwrap();
    }

    let client_local = Dual {
        addr: addr(2),
        port: 40002,
    };
    let client_quad = client.connect(client_local, server_local).unwrap();
    run_to_quiescence(&mut server, &mut client);

    client.close(client_quad).unwrap();
    assert!(!client.is_writable(client_quad));
    assert!(client.is_state(client_quad, "FIN-WAIT-1"));

    // One round: server's ACK of our FIN arrives.
    while tick(&mut server, &mut client) && client.is_state(client_quad, "FIN-WAIT-1") {}
    assert!(client.is_state(client_quad, "FIN-WAIT-2"));

    let server_quad = accepted.borrow().unwrap();
    server.close(server_quad).unwrap();

    run_to_quiescence(&mut server, &mut client);
    assert!(client.is_state(client_quad, "TIME-WAIT"));

    thread::sleep(TEST_MSL * 3);
    client.poll();
    assert!(!client.is_connected(client_quad));
    assert_eq!(client.active_connections(), 0);
}
