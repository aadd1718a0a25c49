//! Standalone remote CLI client for an `odb` session: connects over TCP and
//! runs the same command language the on-server `mode_server_cli` handler
//! does, one line at a time, until stdin closes.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use log::info;

use odb::cli::evaluate;
use odb::client::{ClientFacade, TcpBackend};
use odb::ClientConfig;

fn main() -> ExitCode {
    drop(env_logger::try_init());

    let config = match parse_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let backend = match TcpBackend::connect(&config.host, config.port) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("could not connect to {}:{}: {e}", config.host, config.port);
            return ExitCode::FAILURE;
        }
    };

    let mut client = ClientFacade::new(backend);
    match client.connect() {
        Ok(vm_infos) => info!("connected to {} ({})", config.host, vm_infos.name),
        Err(e) => {
            eprintln!("connect failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    run_repl(&mut client);
    ExitCode::SUCCESS
}

fn run_repl(client: &mut ClientFacade<TcpBackend>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("(odb) ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("stdin read error: {e}");
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        println!("{}", evaluate(line, client));
    }
}

/// `odb-cli [host [port]]`, defaulting to [`ClientConfig::default`].
fn parse_args() -> Result<ClientConfig, String> {
    let mut config = ClientConfig::default();
    let mut args = std::env::args().skip(1);
    if let Some(host) = args.next() {
        config.host = host;
    }
    if let Some(port) = args.next() {
        config.port = port
            .parse()
            .map_err(|_| format!("invalid port {port:?}"))?;
    }
    Ok(config)
}
