//! Command-line readiness probe.
//!
//! `rpoll-probe [--config FILE] [--timeout MS] [--backend native|emulated]
//! [--trace] [FD[:MASK]]...`
//!
//! Polls the listed descriptors once (stdin for `IN` when none are given) and
//! prints one line per ready descriptor. Exit status: 0 something was ready,
//! 1 timed out, 2 error.

use std::env;
use std::process::ExitCode;

use log::{error, info, warn};
use rpoll_core::{logger, BackendKind, Descriptor, Error, EventMask, Poll, PollConfig, WatchEntry};

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    timeout_ms: Option<i64>,
    backend: Option<BackendKind>,
    trace: bool,
    targets: Vec<(i32, EventMask)>,
}

fn parse_target(target: &str) -> Result<(i32, EventMask), String> {
    let (fd, mask) = match target.split_once(':') {
        Some((fd, mask)) => (fd, mask.parse::<EventMask>()?),
        None => (target, EventMask::IN),
    };
    let fd = fd.parse::<i32>().map_err(|_| format!("bad descriptor: {}", fd))?;
    Ok((fd, mask))
}

fn parse_args<I: Iterator<Item = String>>(mut it: I) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => args.config = Some(it.next().ok_or("--config needs a path")?),
            "--timeout" | "-t" => {
                let v = it.next().ok_or("--timeout needs milliseconds")?;
                args.timeout_ms = Some(v.parse().map_err(|_| format!("bad timeout: {}", v))?);
            }
            "--backend" | "-b" => {
                let v = it.next().ok_or("--backend needs a name")?;
                args.backend = Some(v.parse()?);
            }
            "--trace" => args.trace = true,
            other if other.starts_with('-') && other.parse::<i64>().is_err() => {
                return Err(format!("unknown option: {}", other));
            }
            target => args.targets.push(parse_target(target)?),
        }
    }
    if args.targets.is_empty() {
        args.targets.push((0, EventMask::IN));
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<PollConfig, String> {
    let mut cfg = match &args.config {
        Some(path) => PollConfig::load_from_file(path).map_err(|e| format!("{}: {}", path, e))?,
        None => PollConfig::default(),
    };
    if args.backend.is_some() {
        cfg.backend = args.backend;
    }
    if let Some(t) = args.timeout_ms {
        cfg.timeout_ms = t;
    }
    cfg.trace |= args.trace;
    if cfg.trace && cfg.log_level < log::LevelFilter::Debug {
        cfg.log_level = log::LevelFilter::Debug;
    }
    Ok(cfg)
}

fn run(args: Args) -> ExitCode {
    let cfg = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("rpoll-probe: {}", e);
            return ExitCode::from(2);
        }
    };
    logger::init(cfg.log_level);

    install_signals();

    let poll = match Poll::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!("no usable backend: {}", e);
            return ExitCode::from(2);
        }
    };
    info!("polling {} descriptors with {} backend, timeout {}ms", args.targets.len(), poll.backend_name(), cfg.timeout_ms);

    let watch: Vec<_> = args
        .targets
        .iter()
        .map(|&(fd, mask)| WatchEntry::new(Descriptor::from_raw(fd), mask))
        .collect();

    loop {
        match poll.poll(&watch, cfg.timeout_ms) {
            Ok(res) if res.is_empty() => {
                println!("timeout");
                return ExitCode::from(1);
            }
            Ok(res) => {
                for (handle, events) in res.iter() {
                    println!("fd {}: {} ({:#06x})", handle.raw(), events, events.to_raw());
                }
                return ExitCode::SUCCESS;
            }
            Err(Error::PollInterrupted) if !terminating() => {
                // the timeout restarts in full; good enough for a probe
                info!("interrupted, polling again");
            }
            Err(e) => {
                error!("{}", e);
                return ExitCode::from(2);
            }
        }
    }
}

#[cfg(unix)]
fn install_signals() {
    if let Err(e) = rpoll_core::signals::init_term_signals() {
        warn!("signal handlers not installed: {}", e);
    }
}

#[cfg(not(unix))]
fn install_signals() {}

#[cfg(unix)]
fn terminating() -> bool {
    rpoll_core::signals::should_terminate()
}

#[cfg(not(unix))]
fn terminating() -> bool {
    false
}

fn main() -> ExitCode {
    match parse_args(env::args().skip(1)) {
        Ok(args) => run(args),
        Err(e) => {
            eprintln!("rpoll-probe: {}", e);
            eprintln!("usage: rpoll-probe [--config FILE] [--timeout MS] [--backend native|emulated] [--trace] [FD[:MASK]]...");
            ExitCode::from(2)
        }
    }
}
