//! A client that calls `resume(to_finish)` then `stop` observes the VM pause
//! again within a bounded number of instructions, driven entirely over a
//! real TCP loopback connection to a [`ServerApp`].

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use odb_core::client::{ClientFacade, ClientState, TcpBackend};
use odb_core::config::ServerConfig;
use odb_core::server::ServerApp;

use support::IdleVm;

#[test]
fn stop_while_running_converges_to_stopped() {
    let port = support::free_tcp_port();
    let config = ServerConfig {
        enabled: true,
        nostart: true,
        mode_server_cli: false,
        server_cli_sighandler: false,
        mode_tcp: true,
        tcp_port: port,
    };

    let done = Arc::new(AtomicBool::new(false));
    let done_host = done.clone();
    let host = thread::spawn(move || {
        let mut server = ServerApp::new(IdleVm::new(), config).expect("server construction");
        while !done_host.load(Ordering::Relaxed) {
            server.on_tick().expect("on_tick must not fail for IdleVm");
            thread::sleep(Duration::from_millis(1));
        }
    });

    let backend = connect_with_retries(port);
    let mut client = ClientFacade::new(backend);
    client.connect().unwrap();
    assert_eq!(client.state(), ClientState::VmStopped, "nostart must stop before the first instruction");

    client.resume(odb_core::types::ResumeType::ToFinish).unwrap();
    assert_eq!(client.state(), ClientState::VmRunning);

    client.stop().unwrap();

    let mut stopped = false;
    for _ in 0..500 {
        let update = client.check_stopped().unwrap();
        if update.stopped {
            stopped = true;
            break;
        }
        thread::sleep(Duration::from_millis(2));
    }
    assert!(stopped, "check_stopped never converged after stop()");
    assert_eq!(client.state(), ClientState::VmStopped);

    done.store(true, Ordering::Relaxed);
    drop(client);
    host.join().expect("host thread panicked");
}

fn connect_with_retries(port: u16) -> TcpBackend {
    for _ in 0..200 {
        if let Ok(backend) = TcpBackend::connect("127.0.0.1", port) {
            return backend;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("server never accepted a connection on port {port}");
}
