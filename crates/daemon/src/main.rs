// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lwd — the Legwork task-delegation daemon.

use lw_daemon::lifecycle;

#[tokio::main]
async fn main() {
    if std::env::args().any(|a| a == "--version" || a == "-V") {
        println!("lwd {}", lw_daemon::env::DAEMON_VERSION);
        return;
    }
    if let Err(e) = lifecycle::run().await {
        eprintln!("lwd: {e}");
        std::process::exit(1);
    }
}
