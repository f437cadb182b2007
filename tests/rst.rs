//! Scenario 6 from spec §8: a RST delivered mid-stream tears the
//! connection down immediately, on both the sending side (which
//! removes the connection as soon as `abort` is called) and the
//! receiving side (which fires `on_disconnect` with "connection reset"
//! instead of walking any FIN-WAIT state).

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{addr, engine, run_to_quiescence};
use tcp_engine::Dual;

#[test]
fn abort_sends_reset_and_peer_tears_down_without_fin_wait() {
    let mut server = engine(1, 10);
    let mut client = engine(2, 10);

    let server_local = Dual {
        addr: addr(1),
        port: 8095,
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
        port: 40020,
    };
    let client_quad = client.connect(client_local, server_local).unwrap();
    run_to_quiescence(&mut server, &mut client);
    let server_quad = accepted.borrow().unwrap();

    server.write(server_quad, b"some bytes before the reset", true).unwrap();
    run_to_quiescence(&mut server, &mut client);

    let reason = Rc::new(RefCell::new(None));
    {
        let reason = reason.clone();
        client
            .set_on_disconnect(client_quad, move |_quad, why| *reason.borrow_mut() = Some(why))
            .unwrap();
    }

    server.abort(server_quad).unwrap();
    assert_eq!(server.active_connections(), 0);

    run_to_quiescence(&mut server, &mut client);

    assert_eq!(*reason.borrow(), Some("connection reset"));
    assert!(!client.is_connected(client_quad));
    assert!(!client.is_state(client_quad, "FIN-WAIT-1"));
    assert!(!client.is_state(client_quad, "CLOSE-WAIT"));
    assert_eq!(client.active_connections(), 0);
}
