// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use winlayout::edge::cdp::DEFAULT_DEBUG_PORT;
use winlayout::score::DEFAULT_MIN_SCORE;

#[derive(Parser)]
#[command(name = "winlayout", version, about = "Save & restore Windows desktop layouts")]
struct Cli {
    /// More logging (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the current desktop into a layout file.
    Save {
        json_path: PathBuf,
        /// Also capture Edge tabs from a live debug session.
        #[arg(long)]
        edge_tabs: bool,
        #[arg(long, default_value_t = DEFAULT_DEBUG_PORT)]
        edge_debug_port: u16,
    },
    /// Reconcile the desktop against a saved layout.
    Restore {
        json_path: PathBuf,
        /// Launch apps that are missing before positioning.
        #[arg(long)]
        launch_missing: bool,
        /// Restore saved Edge tabs/windows.
        #[arg(long)]
        edge_tabs: bool,
        /// Close matching windows flagged destructive and relaunch them clean.
        #[arg(long)]
        destructive: bool,
        /// Print the top-ranked candidates per target.
        #[arg(long)]
        diagnostics: bool,
        #[arg(long, default_value_t = 3)]
        diagnostics_top: usize,
        #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
        min_score: i32,
        /// Seconds to wait after launching missing applications.
        #[arg(long, default_value_t = 6.0)]
        settle_wait: f64,
    },
    /// Start a debug-mode Edge on a scratch profile.
    EdgeDebug {
        #[arg(long, default_value_t = DEFAULT_DEBUG_PORT)]
        port: u16,
        #[arg(long)]
        profile_dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Merge live CDP tabs into an existing layout file.
    EdgeCapture {
        json_path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DEBUG_PORT)]
        port: u16,
    },
    /// Upgrade a layout file to the current schema in place.
    Migrate { json_path: PathBuf },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "winlayout=info",
        1 => "winlayout=debug",
        _ => "winlayout=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Save {
            json_path,
            edge_tabs,
            edge_debug_port,
        } => run_save(&json_path, edge_tabs, edge_debug_port),
        Command::Restore {
            json_path,
            launch_missing,
            edge_tabs,
            destructive,
            diagnostics,
            diagnostics_top,
            min_score,
            settle_wait,
        } => {
            let opts = winlayout::RestoreOptions {
                launch_missing,
                edge_tabs,
                destructive,
                diagnostics,
                diagnostics_top,
                min_score,
                settle_wait: Duration::from_secs_f64(settle_wait.max(0.0)),
            };
            run_restore(&json_path, &opts)
        }
        Command::EdgeDebug {
            port,
            profile_dir,
            dry_run,
        } => {
            let ok = winlayout::edge::replay::launch_debug_session(
                port,
                profile_dir.as_deref(),
                dry_run,
            );
            println!("{}", if ok { "Edge debug launched." } else { "Failed." });
            if ok {
                Ok(())
            } else {
                return ExitCode::FAILURE;
            }
        }
        Command::EdgeCapture { json_path, port } => {
            winlayout::restore::edge_capture(&json_path, port).map(|(tabs, windows)| {
                println!(
                    "Captured {tabs} tabs into {windows} Edge windows -> {}",
                    json_path.display()
                );
            })
        }
        Command::Migrate { json_path } => winlayout::model::read_layout_value(&json_path)
            .and_then(winlayout::migrate)
            .and_then(|migrated| {
                winlayout::model::write_layout_value(&json_path, &migrated)?;
                println!("Migrated -> {}", json_path.display());
                Ok(())
            }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run_save(path: &std::path::Path, edge_tabs: bool, debug_port: u16) -> winlayout::Result<()> {
    let opts = winlayout::SaveOptions {
        edge_tabs,
        debug_port,
    };
    let report = winlayout::save(path, &opts)?;
    println!(
        "Saved {} windows, {} Edge tabs -> {}",
        report.windows,
        report.edge_tabs,
        path.display()
    );
    Ok(())
}

#[cfg(windows)]
fn run_restore(path: &std::path::Path, opts: &winlayout::RestoreOptions) -> winlayout::Result<()> {
    use std::io::IsTerminal;
    use winlayout::edge::replay::{TabChooser, TerminalChooser};

    // The interactive wizard only makes sense on a real terminal; piped
    // callers get the grouped-batch fallback instead.
    let mut terminal = TerminalChooser;
    let chooser: Option<&mut dyn TabChooser> = if std::io::stdin().is_terminal() {
        Some(&mut terminal)
    } else {
        None
    };
    let summary = winlayout::restore(path, opts, chooser)?;
    println!("{summary}");
    if summary.skipped > 0 {
        println!("  Skipped: title changed, window elevated, or system-managed.");
    }
    Ok(())
}

#[cfg(not(windows))]
fn run_save(_path: &std::path::Path, _edge_tabs: bool, _debug_port: u16) -> winlayout::Result<()> {
    Err(winlayout::LayoutError::Malformed(
        "window capture requires Windows".into(),
    ))
}

#[cfg(not(windows))]
fn run_restore(
    _path: &std::path::Path,
    _opts: &winlayout::RestoreOptions,
) -> winlayout::Result<()> {
    Err(winlayout::LayoutError::Malformed(
        "window restore requires Windows".into(),
    ))
}
