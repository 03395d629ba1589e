use anyhow::{anyhow, bail, Context, Result};
use std::time::Duration;

/// One line of a replay script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Down(String),
    Up(String),
    /// Every key down in order, then every key up in the same order.
    Chord(Vec<String>),
    Backspace,
    Clear,
    Wait(Duration),
}

pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_line(line).with_context(|| format!("line {}: {:?}", idx + 1, raw))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> Result<Step> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("").to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let single = |name: &str| -> Result<String> {
        match args.as_slice() {
            [key] => Ok(key.to_string()),
            _ => bail!("`{}` takes exactly one key", name),
        }
    };

    match command.as_str() {
        "down" => Ok(Step::Down(single("down")?)),
        "up" => Ok(Step::Up(single("up")?)),
        "chord" => {
            if args.is_empty() {
                bail!("`chord` needs at least one key");
            }
            Ok(Step::Chord(args.iter().map(|k| k.to_string()).collect()))
        }
        "backspace" | "clear" if !args.is_empty() => {
            bail!("`{}` takes no arguments", command)
        }
        "backspace" => Ok(Step::Backspace),
        "clear" => Ok(Step::Clear),
        "wait" => {
            let ms = single("wait")?;
            let ms: u64 = ms
                .parse()
                .map_err(|_| anyhow!("`wait` expects milliseconds, got {:?}", ms))?;
            Ok(Step::Wait(Duration::from_millis(ms)))
        }
        other => bail!("unknown command {:?}", other),
    }
}
