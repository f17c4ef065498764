use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use trickplay::engine::{BoundaryAction, PlaybackHooks};
use trickplay::player::{VirtualPlayer, notification_channel};
use trickplay::{PlayerCapabilities, RemoteKey, TrickPlayConfig, TrickPlaySession};

/// Simulated content length.
const CONTENT_MS: u64 = 600_000;
/// Host loop granularity while waiting.
const FRAME: Duration = Duration::from_millis(100);

/// Stop at the end of content instead of resuming play.
struct PauseAtEnd;

impl PlaybackHooks for PauseAtEnd {
    fn player_playing(&mut self) {
        log::debug!("Player is playing");
    }

    fn at_end(&mut self) -> BoundaryAction {
        BoundaryAction::Pause
    }
}

enum Command {
    Key(RemoteKey),
    Wait(Duration),
    Reject(i32),
    Accept,
    FailSeeks(bool),
    Help,
}

fn parse_line(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    if first.starts_with('#') {
        return Ok(None);
    }
    let mut number = |what: &str| -> Result<i64> {
        let word = words.next().ok_or_else(|| anyhow!("{first}: missing {what}"))?;
        word.parse()
            .with_context(|| format!("{first}: invalid {what} '{word}'"))
    };
    let command = match first {
        "wait" => Command::Wait(Duration::from_millis(number("milliseconds")?.max(0) as u64)),
        "reject" => Command::Reject(number("rate")? as i32),
        "accept" => Command::Accept,
        "failseek" => Command::FailSeeks(number("flag (0/1)")? != 0),
        "help" => Command::Help,
        other => match RemoteKey::from_name(other) {
            Some(key) => Command::Key(key),
            None => bail!("unknown command '{other}'"),
        },
    };
    Ok(Some(command))
}

fn print_legend() {
    println!("Keys:");
    for (key, action) in RemoteKey::legend() {
        println!("  {key:<10} {action}");
    }
    println!("  wait <ms>  Let time pass");
    println!("  reject <r> Player refuses rate r");
    println!("  accept     Player accepts every rate");
    println!("  failseek <0|1>");
}

fn print_info(session: &TrickPlaySession<VirtualPlayer>) {
    let info = session.info();
    let duration = info
        .duration_ms
        .map_or_else(|| "live".to_string(), |d| format!("{:.1}s", d as f64 / 1000.0));
    println!(
        "{:<14} x{:<5} {:>8.1}s / {}{}",
        info.mode.display_name(),
        info.multiplier,
        info.position_ms as f64 / 1000.0,
        duration,
        if info.awaiting_confirmation { "  (waiting for player)" } else { "" },
    );
}

fn run(session: &mut TrickPlaySession<VirtualPlayer>, command: Command) {
    match command {
        Command::Key(key) => {
            if !session.handle_key(key) {
                println!("{key} ignored");
            }
            session.update(Duration::ZERO);
        }
        Command::Wait(total) => {
            let mut remaining = total;
            while !remaining.is_zero() {
                let dt = remaining.min(FRAME);
                session.player_mut().advance(dt);
                session.update(dt);
                remaining -= dt;
            }
        }
        Command::Reject(rate) => session.player_mut().reject_rate(rate),
        Command::Accept => session.player_mut().accept_all_rates(),
        Command::FailSeeks(fail) => session.player_mut().set_fail_seeks(fail),
        Command::Help => print_legend(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // --simulated: drive a seek-only player
    let simulated = std::env::args().any(|a| a == "--simulated");
    let capabilities = if simulated {
        PlayerCapabilities::SEEK_ONLY
    } else {
        PlayerCapabilities::NATIVE
    };

    let config = TrickPlayConfig::load();
    let (tx, rx) = notification_channel();
    let player = VirtualPlayer::new(tx, capabilities, Some(CONTENT_MS));
    let mut session = TrickPlaySession::new_with_hooks(player, rx, config, Box::new(PauseAtEnd))?;
    let events = session.subscribe();

    let stdin = std::io::stdin();
    for (number, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read script")?;
        match parse_line(&line) {
            Ok(Some(command)) => run(&mut session, command),
            Ok(None) => continue,
            Err(e) => {
                log::warn!("line {}: {e:#}", number + 1);
                continue;
            }
        }
        for event in events.try_iter() {
            log::debug!("{event:?}");
        }
        print_info(&session);
    }

    session.shutdown();
    Ok(())
}
