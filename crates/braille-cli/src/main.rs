mod script;

use anyhow::{Context, Result};
use braille_core::session::BACKSPACE_KEY;
use braille_core::{HttpRequester, KeyAction, Profile, Session, Snapshot};
use clap::Parser;
use script::{parse_script, Step};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "braille-replay",
    about = "Replay a key-event script through a Braille chord session"
)]
struct Cli {
    /// Script file (reads stdin when omitted)
    script: Option<PathBuf>,
    /// Profile JSON with key map and suggestion settings
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Suggestion service base URL (overrides the profile)
    #[arg(long)]
    url: Option<String>,
    /// How long to wait for the last suggestions before exiting
    #[arg(long, default_value = "2000")]
    settle_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    let mut profile = match &cli.profile {
        Some(path) => Profile::load(path)?,
        None => Profile::default(),
    };
    if let Some(url) = cli.url.clone() {
        profile = profile.with_base_url(url);
    }

    let mut session = Session::from_profile(&profile).context("invalid key map")?;
    if profile.suggest.is_configured() {
        let requester = HttpRequester::new(&profile.suggest)?;
        session = session.with_requester(requester)?;
    } else {
        info!("No suggestion service configured; suggestions stay empty.");
    }

    let text = match &cli.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let steps = parse_script(&text)?;
    info!("Replaying {} steps", steps.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printer = SnapshotPrinter::default();
    printer.emit(&mut out, session.snapshot())?;

    for step in &steps {
        run_step(&mut session, step);
        session.poll_suggestions();
        printer.emit(&mut out, session.snapshot())?;
    }

    if !session.wait_for_suggestions(Duration::from_millis(cli.settle_ms)) {
        info!("Gave up waiting for suggestions after {} ms", cli.settle_ms);
    }
    printer.emit(&mut out, session.snapshot())?;
    out.flush()?;
    Ok(())
}

fn run_step(session: &mut Session, step: &Step) {
    match step {
        Step::Down(key) => log_action(key, session.on_key_down(key)),
        Step::Up(key) => log_action(key, session.on_key_up(key)),
        Step::Chord(keys) => {
            for key in keys {
                log_action(key, session.on_key_down(key));
            }
            for key in keys {
                log_action(key, session.on_key_up(key));
            }
        }
        Step::Backspace => {
            log_action(BACKSPACE_KEY, session.on_key_down(BACKSPACE_KEY));
            session.on_key_up(BACKSPACE_KEY);
        }
        Step::Clear => session.clear(),
        Step::Wait(duration) => {
            session.wait_for_suggestions(*duration);
        }
    }
}

fn log_action(key: &str, action: KeyAction) {
    match action {
        KeyAction::Commit(ch) => debug!("{} -> commit {:?}", key, ch),
        KeyAction::Erase(ch) => debug!("{} -> erase {:?}", key, ch),
        KeyAction::Pass | KeyAction::Block => {}
    }
}

/// Writes a snapshot as one JSON line, skipping repeats.
#[derive(Default)]
struct SnapshotPrinter {
    last: Option<Snapshot>,
}

impl SnapshotPrinter {
    fn emit<W: Write>(&mut self, out: &mut W, snapshot: Snapshot) -> Result<()> {
        if self.last.as_ref() == Some(&snapshot) {
            return Ok(());
        }
        writeln!(out, "{}", serde_json::to_string(&snapshot)?)?;
        self.last = Some(snapshot);
        Ok(())
    }
}
