//! Scenario 5 from spec §8: both ends call `close()` before either
//! sees the other's FIN, so both walk FIN-WAIT-1 -> CLOSING -> TIME-WAIT
//! instead of the usual active/passive split.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

use common::{addr, engine, run_to_quiescence, TEST_MSL};
use tcp_engine::Dual;

#[test]
fn simultaneous_close_both_sides_reach_time_wait_via_closing() {
    let mut server = engine(1, 10);
    let mut client = engine(2, 10);

    let server_local = Dual {
        addr: addr(1),
        port: 8090,
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
        port: 40010,
    };
    let client_quad = client.connect(client_local, server_local).unwrap();
    run_to_quiescence(&mut server, &mut client);
    let server_quad = accepted.borrow().unwrap();

    // Both sides close before either has seen the other's FIN.
    client.close(client_quad).unwrap();
    server.close(server_quad).unwrap();
    assert!(client.is_state(client_quad, "FIN-WAIT-1"));
    assert!(server.is_state(server_quad, "FIN-WAIT-1"));

    // Each side's FIN arrives at the other while neither has yet seen
    // its own FIN acknowledged, so both land in CLOSING rather than
    // FIN-WAIT-2 or CLOSE-WAIT.
    common::tick(&mut server, &mut client);
    common::tick(&mut server, &mut client);
    assert!(client.is_state(client_quad, "CLOSING"));
    assert!(server.is_state(server_quad, "CLOSING"));

    run_to_quiescence(&mut server, &mut client);
    assert!(client.is_state(client_quad, "TIME-WAIT"));
    assert!(server.is_state(server_quad, "TIME-WAIT"));

    thread::sleep(TEST_MSL * 3);
    server.poll();
    client.poll();
    assert_eq!(server.active_connections(), 0);
    assert_eq!(client.active_connections(), 0);
}
