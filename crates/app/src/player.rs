//! Interactive session loop. Stdin is read on its own thread; everything
//! that touches the controller happens on this one.

use std::{
    io::BufRead,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use binaural_core::{
    AppConfig, AudioOutput, BinauralError, Clock, PlaybackState, PresetId, SessionConfig,
    SessionController, SystemClock, Ticker,
};

use crate::view;

const IDLE_WAIT: Duration = Duration::from_millis(250);

/// A user intent typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle,
    Stop,
    Volume(f32),
    Beat(f32),
    Carrier(f32),
    Duration(u32),
    Preset(PresetId),
    Status,
    Presets,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Toggle);
        };
        let arg = words.next();

        fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
            let raw = arg.ok_or_else(|| format!("{what} needs a value"))?;
            raw.parse()
                .map_err(|_| format!("`{raw}` is not a valid {what}"))
        }

        match head.to_ascii_lowercase().as_str() {
            "p" | "play" | "pause" | "toggle" => Ok(Command::Toggle),
            "s" | "stop" => Ok(Command::Stop),
            "v" | "volume" => number(arg, "volume").map(Command::Volume),
            "b" | "beat" => number(arg, "beat frequency").map(Command::Beat),
            "c" | "carrier" => number(arg, "carrier frequency").map(Command::Carrier),
            "d" | "duration" => number(arg, "duration").map(Command::Duration),
            "preset" => {
                let raw = arg.ok_or("preset needs a name")?;
                raw.parse().map(Command::Preset).map_err(|e: BinauralError| e.to_string())
            }
            "presets" | "l" | "list" => Ok(Command::Presets),
            "status" | "i" => Ok(Command::Status),
            "h" | "help" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => other
                .parse()
                .map(Command::Preset)
                .map_err(|_| format!("unknown command `{other}` (type `help`)")),
        }
    }
}

/// Opens the audio device and runs the session loop until the user quits.
#[cfg(feature = "device")]
pub fn run(app: &AppConfig, session: SessionConfig) -> binaural_core::Result<()> {
    match binaural_core::DeviceOutput::open_default(app.audio.block_size) {
        Ok(output) => run_with(output, app, session),
        Err(err) => {
            println!("{}", view::audio_notice(&err));
            Ok(())
        }
    }
}

#[cfg(not(feature = "device"))]
pub fn run(app: &AppConfig, session: SessionConfig) -> binaural_core::Result<()> {
    tracing::warn!("built without the `device` feature; the session will be silent");
    run_with(
        binaural_core::HeadlessOutput::new(app.audio.sample_rate),
        app,
        session,
    )
}

fn run_with<O: AudioOutput>(
    output: O,
    app: &AppConfig,
    session: SessionConfig,
) -> binaural_core::Result<()> {
    let clock = SystemClock::new();
    let mut controller = SessionController::with_defaults(output, clock, &app.session);
    controller.set_carrier(session.carrier_hz)?;
    controller.set_beat(session.beat_hz)?;
    controller.set_duration(session.duration_minutes)?;

    let mut ticker = Ticker::every_second();
    let commands = spawn_reader();
    let mut input_open = true;

    println!("{}", view::help());
    println!("{}", view::status(&controller));

    loop {
        let now = clock.now();
        let wait = [ticker.next_deadline(), controller.next_teardown()]
            .into_iter()
            .flatten()
            .min()
            .map(|due| due.saturating_sub(now))
            .unwrap_or(IDLE_WAIT);

        let received = if input_open {
            match commands.recv_timeout(wait) {
                Ok(received) => Some(received),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("input closed; finishing current session");
                    input_open = false;
                    None
                }
            }
        } else {
            thread::sleep(wait);
            None
        };

        let mut show_status = false;
        match received {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(command)) => {
                handle(&mut controller, command);
                show_status = true;
            }
            Some(Err(message)) => println!("{message}"),
            None => {}
        }

        sync_ticker(&mut ticker, controller.state(), clock.now());
        for _ in 0..ticker.due(clock.now()) {
            controller.tick();
            show_status = true;
        }
        sync_ticker(&mut ticker, controller.state(), clock.now());
        controller.poll();

        for event in controller.drain_events() {
            if let Some(line) = view::event_line(&event) {
                println!("{line}");
            }
        }
        if show_status {
            println!("{}", view::status(&controller));
        }

        if !input_open
            && controller.state() == PlaybackState::Idle
            && controller.pending_teardowns() == 0
        {
            break;
        }
    }

    controller.shutdown();
    Ok(())
}

fn handle<O: AudioOutput, C: Clock>(controller: &mut SessionController<O, C>, command: Command) {
    let result = match command {
        Command::Toggle => controller.toggle(),
        Command::Stop => {
            controller.stop();
            Ok(())
        }
        Command::Volume(volume) => {
            controller.set_volume(volume);
            Ok(())
        }
        Command::Beat(hz) => controller.set_beat(hz).map(drop),
        Command::Carrier(hz) => controller.set_carrier(hz).map(drop),
        Command::Duration(minutes) => controller.set_duration(minutes).map(drop),
        Command::Preset(id) => {
            controller.select_preset(id);
            Ok(())
        }
        Command::Presets => {
            print!("{}", view::preset_tiles(binaural_core::catalog(), Some(controller.preset().id)));
            Ok(())
        }
        Command::Help => {
            println!("{}", view::help());
            Ok(())
        }
        Command::Status | Command::Quit => Ok(()),
    };

    match result {
        Err(err) if err.is_audio_unavailable() => println!("{}", view::audio_notice(&err)),
        Err(err) => println!("{err}"),
        Ok(()) => {}
    }
}

/// Keeps the one-second tick armed exactly while a session is playing.
fn sync_ticker(ticker: &mut Ticker, state: PlaybackState, now: Duration) {
    match state {
        PlaybackState::Playing if !ticker.is_armed() => ticker.arm(now),
        PlaybackState::Playing => {}
        PlaybackState::Idle | PlaybackState::Paused => ticker.cancel(),
    }
}

fn spawn_reader() -> Receiver<Result<Command, String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Command::parse(&line)).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(Command::parse("").unwrap(), Command::Toggle);
        assert_eq!(Command::parse("  s ").unwrap(), Command::Stop);
        assert_eq!(Command::parse("v 0.4").unwrap(), Command::Volume(0.4));
        assert_eq!(Command::parse("d 30").unwrap(), Command::Duration(30));
        assert_eq!(
            Command::parse("preset Meditate").unwrap(),
            Command::Preset(PresetId::Meditation)
        );
        assert_eq!(Command::parse("sleep").unwrap(), Command::Preset(PresetId::Sleep));
    }

    #[test]
    fn reports_bad_arguments() {
        assert!(Command::parse("b").unwrap_err().contains("needs a value"));
        assert!(Command::parse("d ten").unwrap_err().contains("ten"));
        assert!(Command::parse("dance").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn ticker_follows_playback_state() {
        let mut ticker = Ticker::every_second();
        sync_ticker(&mut ticker, PlaybackState::Playing, Duration::from_secs(3));
        assert_eq!(ticker.next_deadline(), Some(Duration::from_secs(4)));

        sync_ticker(&mut ticker, PlaybackState::Playing, Duration::from_secs(3));
        assert_eq!(ticker.next_deadline(), Some(Duration::from_secs(4)));

        sync_ticker(&mut ticker, PlaybackState::Paused, Duration::from_secs(3));
        assert!(!ticker.is_armed());
    }
}
