//! Line-oriented console front end
//!
//! Parses one command per line and maps it onto the playback command
//! interface. Output goes to any `Write` so the loop can be driven from
//! tests.

use crate::browser::Browser;
use crate::playback::control::{PlaybackControl, PlaybackSnapshot};
use rawnav_common::human_time::format_progress;
use std::io::{self, Write};
use std::sync::Arc;

pub const HELP: &str = "\
Commands:
  ls            list the current directory
  cd <dir>      change directory (cd .. for the parent)
  play <file>   play a file
  loop <file>   play a file in loop mode
  p             pause / resume
  f / b         seek forward / back
  s             stop
  n             next file in the directory
  a             playlist from the current directory
  pl <dir>      playlist from a directory
  l             toggle loop mode
  i             show status
  h             this help
  q             quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ChangeDir(String),
    Play(String),
    Loop(String),
    PauseResume,
    Forward,
    Back,
    Stop,
    Next,
    PlaylistHere,
    PlaylistFrom(String),
    ToggleLoop,
    Info,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let needs_arg = |build: fn(String) -> Command| {
            if arg.is_empty() {
                Err(format!("'{}' needs an argument", word))
            } else {
                Ok(build(arg.to_string()))
            }
        };

        let command = match word {
            "ls" => Command::List,
            "cd" => needs_arg(Command::ChangeDir)?,
            "play" => needs_arg(Command::Play)?,
            "loop" => needs_arg(Command::Loop)?,
            "p" => Command::PauseResume,
            "f" => Command::Forward,
            "b" => Command::Back,
            "s" => Command::Stop,
            "n" => Command::Next,
            "a" => Command::PlaylistHere,
            "pl" => needs_arg(Command::PlaylistFrom)?,
            "l" => Command::ToggleLoop,
            "i" => Command::Info,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}' (h for help)", other)),
        };
        Ok(Some(command))
    }
}

/// Whether the loop should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    control: Arc<PlaybackControl>,
    browser: Browser,
}

impl Console {
    pub fn new(control: Arc<PlaybackControl>, browser: Browser) -> Self {
        Self { control, browser }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Run one command. Playback commands report through the control
    /// block's status events; only browser output is written here.
    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<Flow> {
        let seek_step = self.control.settings().seek_step_secs;

        match command {
            Command::List => match self.browser.list() {
                Ok(entries) => {
                    writeln!(out, "{}:", self.browser.cwd().display())?;
                    for entry in entries {
                        let marker = if entry.is_dir { "/" } else { "" };
                        writeln!(out, "  {}{}", entry.name, marker)?;
                    }
                }
                Err(e) => writeln!(out, "Cannot list {}: {}", self.browser.cwd().display(), e)?,
            },
            Command::ChangeDir(dir) => match self.browser.change_dir(&dir) {
                Ok(cwd) => writeln!(out, "{}", cwd.display())?,
                Err(e) => writeln!(out, "cd {}: {}", dir, e)?,
            },
            Command::Play(file) => self.control.play(self.browser.resolve(&file), false),
            Command::Loop(file) => self.control.play(self.browser.resolve(&file), true),
            Command::PauseResume => self.control.pause_resume(),
            Command::Forward => self.control.seek_relative(seek_step),
            Command::Back => self.control.seek_relative(-seek_step),
            Command::Stop => self.control.stop(),
            Command::Next => self.control.next(),
            Command::PlaylistHere => {
                self.control.load_playlist(self.browser.cwd());
            }
            Command::PlaylistFrom(dir) => {
                self.control.load_playlist(self.browser.resolve(&dir));
            }
            Command::ToggleLoop => self.control.toggle_loop(),
            Command::Info => writeln!(out, "{}", status_line(&self.control.snapshot()))?,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

/// One-line summary of the playback state
pub fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let Some(name) = snapshot.active_name.as_deref() else {
        return "[STOPPED]".to_string();
    };

    let state = if snapshot.paused { "PAUSED" } else { "PLAYING" };
    let mut line = format!(
        "[{}] {}  {}",
        state,
        name,
        format_progress(snapshot.elapsed_secs, snapshot.total_secs)
    );
    if let Some((index, len)) = snapshot.playlist_position {
        line.push_str(&format!("  [{}/{}]", index + 1, len));
    }
    if snapshot.loop_enabled {
        line.push_str("  loop");
    }
    line
}
