//! Headless pathfinder runner.
//!
//! Reads control commands from stdin (or `--script`), feeds them to the render
//! loop and logs what a renderer would draw.

use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use pathfinder::{Control, Error, MotionState, PathfinderConfig, RenderLoop, Scene};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pathfinder", about = "Walk an agent around a spline path")]
struct Args {
    /// JSON configuration file; defaults are used for missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Commands separated by ';', e.g. "start;wait 3;pause;wait 1;exit;quit"
    #[arg(long)]
    script: Option<String>,

    /// Status reports per second
    #[arg(long, default_value_t = 2.0)]
    report_hz: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Control(Control),
    Wait(Duration),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err("empty command".into());
    };
    let argument = words.next();
    let number = |what: &str| -> Result<f64, String> {
        argument
            .ok_or_else(|| format!("{what} needs a value"))?
            .parse::<f64>()
            .map_err(|e| format!("bad {what} value: {e}"))
    };
    match word.to_ascii_lowercase().as_str() {
        "start" => Ok(Command::Control(Control::Start)),
        "pause" => Ok(Command::Control(Control::Pause)),
        "resume" => Ok(Command::Control(Control::Resume)),
        "exit" => Ok(Command::Control(Control::Exit)),
        "speed" => Ok(Command::Control(Control::SetSpeed(number("speed")?))),
        "wait" => {
            let secs = number("wait")?;
            Duration::try_from_secs_f64(secs)
                .map(Command::Wait)
                .map_err(|e| format!("bad wait value: {e}"))
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn spawn_stdin_reader(tx: Sender<Command>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
    });
}

fn spawn_script(script: String, tx: Sender<Command>) -> Result<(), String> {
    let commands = script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_command)
        .collect::<Result<Vec<_>, _>>()?;
    thread::spawn(move || {
        for command in commands {
            match command {
                Command::Wait(duration) => thread::sleep(duration),
                command => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
            }
        }
    });
    Ok(())
}

/// `None` runs until input closes. Negative or non-finite limits are
/// ignored with a warning.
fn time_limit(seconds: Option<f64>) -> Option<Duration> {
    let seconds = seconds?;
    match Duration::try_from_secs_f64(seconds) {
        Ok(limit) => Some(limit),
        Err(e) => {
            warn!("ignoring --seconds {seconds}: {e}");
            None
        }
    }
}

fn controls_hint(state: MotionState) -> String {
    state.allowed_controls().join(", ")
}

fn run(args: Args) -> pathfinder::error::Result<()> {
    let config = match &args.config {
        Some(path) => PathfinderConfig::load(path)?,
        None => PathfinderConfig::default(),
    };
    let scene = Scene::build(&config)?;
    let deadline = time_limit(args.seconds);

    let (tx, rx): (Sender<Command>, Receiver<Command>) = channel::unbounded();
    match args.script {
        Some(script) => spawn_script(script, tx).map_err(Error::Script)?,
        None => spawn_stdin_reader(tx),
    }

    let mut handle = RenderLoop::new(scene, config.tick())
        .start()
        .map_err(Error::Spawn)?;
    let snapshots = handle.snapshots();

    let report_every = Duration::from_secs_f64(1.0 / args.report_hz.max(0.1));
    let deadline = deadline.map(|d| Instant::now() + d);
    let mut last_state = None;
    let mut input_closed = false;
    info!("controls: {}", controls_hint(MotionState::Idle));

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("time limit reached");
            break;
        }
        if input_closed {
            if deadline.is_none() {
                break;
            }
            thread::sleep(report_every);
        } else {
            match rx.recv_timeout(report_every) {
                Ok(Command::Control(control)) => handle.control(control),
                Ok(Command::Help) => {
                    let state = snapshots.latest().motion_state;
                    info!("controls: {}, quit", controls_hint(state));
                }
                Ok(Command::Quit) => break,
                Ok(Command::Wait(_)) | Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => input_closed = true,
            }
        }

        let snap = snapshots.latest();
        if last_state != Some(snap.motion_state) {
            last_state = Some(snap.motion_state);
            info!(
                state = ?snap.motion_state,
                "allowed controls: {}",
                controls_hint(snap.motion_state)
            );
        }
        info!(
            frame = snap.frame_index,
            state = ?snap.motion_state,
            pending = snap.pending_walk,
            index = snap.agent.position_index,
            agent = ?snap.agent.position,
            camera = ?snap.camera.position,
            speed = snap.speed,
            "status"
        );
    }

    handle.shutdown();
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_controls() {
        assert_eq!(parse_command("start"), Ok(Command::Control(Control::Start)));
        assert_eq!(parse_command(" PAUSE "), Ok(Command::Control(Control::Pause)));
        assert_eq!(
            parse_command("speed 2.5"),
            Ok(Command::Control(Control::SetSpeed(2.5)))
        );
        assert_eq!(
            parse_command("wait 0.5"),
            Ok(Command::Wait(Duration::from_millis(500)))
        );
        assert_eq!(parse_command("q"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("speed").is_err());
        assert!(parse_command("speed fast").is_err());
        assert!(parse_command("wait -1").is_err());
        assert!(parse_command("jump").is_err());
        assert!(parse_command("").is_err());
    }

    #[test]
    fn bad_script_is_an_error() {
        let (tx, rx) = channel::unbounded();
        assert!(spawn_script("start; jump; quit".into(), tx).is_err());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        let args = Args::parse_from(["pathfinder", "--script", "start;speed fast"]);
        assert!(matches!(run(args), Err(Error::Script(_))));
    }

    #[test]
    fn script_runs_in_order() {
        let (tx, rx) = channel::unbounded();
        spawn_script("start; wait 0.01; pause ;quit".into(), tx).unwrap();
        let received: Vec<_> = rx.iter().collect();
        assert_eq!(
            received,
            vec![
                Command::Control(Control::Start),
                Command::Control(Control::Pause),
                Command::Quit,
            ]
        );
    }

    #[test]
    fn time_limit_ignores_unusable_values() {
        assert_eq!(time_limit(None), None);
        assert_eq!(time_limit(Some(2.5)), Some(Duration::from_millis(2500)));
        assert_eq!(time_limit(Some(-1.0)), None);
        assert_eq!(time_limit(Some(f64::NAN)), None);
    }
}
