/**
 * Copyright (c) 2024-2025 Glaive, Inc.
 *
 * This file is part of Glaive Gateway
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

mod aggregator;
mod continuation;
mod engine;
mod error;
mod local;
mod model;
mod proxy;
mod reader;
mod response;
mod scanner;
mod validate;

use std::env;
use std::process;

use clap::{CommandFactory, Parser};
use pingora::proxy::http_proxy_service;
use pingora::server::Server;
use tracing_subscriber::EnvFilter;

use crate::proxy::{LogServProxy, Mode};

const BIND_ADDR: &str = "0.0.0.0:1065";

#[derive(Parser, Debug)]
#[command(
    name = "logserv",
    version,
    about = "Serves recent lines of append-only log files over HTTP"
)]
struct Cli {
    /// Semicolon-separated list of peer hosts; runs in aggregator mode when set.
    #[arg(long)]
    hosts: Option<String>,
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses CLI args and the `HOSTS` env fallback into a run mode, exiting
/// the process directly for `--help`/`--version` and malformed input so
/// the exit codes match a standard CLI (0 for help, 1 for usage errors).
fn resolve_mode() -> Mode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{err}");
                    process::exit(0);
                }
                _ => {
                    eprint!("{err}");
                    process::exit(1);
                }
            }
        }
    };

    let hosts_arg = cli.hosts.or_else(|| env::var("HOSTS").ok());
    match hosts_arg {
        Some(raw) => {
            let hosts = parse_hosts(&raw);
            if hosts.is_empty() {
                eprintln!("{}", Cli::command().render_usage());
                process::exit(1);
            }
            Mode::Aggregator { hosts }
        }
        None => Mode::Local {
            log_root: env::current_dir().expect("current working directory is accessible"),
        },
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mode = resolve_mode();

    let mut server = Server::new(None).expect("pingora server configuration is valid");
    server.bootstrap();

    let proxy = LogServProxy { mode };
    let mut service = http_proxy_service(&server.configuration, proxy);
    service.add_tcp(BIND_ADDR);
    server.add_service(service);

    tracing::info!(addr = BIND_ADDR, "logserv listening");
    server.run_forever();
}