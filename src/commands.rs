// Line commands for the interactive shell
// Track and queue numbers are 1-based on the command line, 0-based once parsed

use anyhow::{anyhow, bail, Result};
use keyplayer::ShortcutAction;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(usize),
    Pause,
    Stop,
    Next,
    Prev,
    Seek(f64),
    Loop,
    Library,
    Queue,
    Add(usize),
    Remove(usize),
    Move(usize, usize),
    Clear,
    Fav(usize),
    Favs,
    Mode { forward: bool },
    Octave(i8),
    Smart(bool),
    PlaylistNew(String),
    PlaylistSave(String),
    PlaylistAdd(String, usize),
    PlaylistLoad(String),
    PlaylistRemove(String),
    PlaylistRename(String, String),
    Playlists,
    Import(String),
    Shortcut(ShortcutAction),
    TestKeys,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  list                       show the album
  play <n>                   play album track n
  pause | stop | next | prev | loop
  seek <secs>
  queue                      show the queue
  add <n> | remove <pos> | move <from> <to> | clear
  fav <n> | favs
  mode <next|prev> | octave <-2..2> | smart <on|off>
  playlist new <name> | playlist save <name>
  playlist add <id> <n> | playlist load <id>
  playlist rm <id> | playlist rename <id> <name>
  playlists
  import <path> | keys | shortcut <action>
  status | help | quit";

fn position(arg: Option<&str>) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("missing number"))?;
    let n: usize = arg.parse().map_err(|_| anyhow!("'{}' is not a number", arg))?;
    if n == 0 {
        bail!("numbers start at 1");
    }
    Ok(n - 1)
}

fn switch(arg: Option<&str>) -> Result<bool> {
    match arg {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("expected on|off"),
    }
}

fn rest(words: &[&str]) -> Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        bail!("missing name");
    }
    Ok(text)
}

fn required<'a>(arg: Option<&'a str>, what: &str) -> Result<&'a str> {
    arg.ok_or_else(|| anyhow!("missing {}", what))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = words.split_first() else {
            bail!("empty command");
        };
        let arg = |i: usize| args.get(i).copied();

        let command = match head {
            "play" => Command::Play(position(arg(0))?),
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "next" => Command::Next,
            "prev" => Command::Prev,
            "seek" => {
                let secs = required(arg(0), "position")?;
                Command::Seek(secs.parse().map_err(|_| anyhow!("'{}' is not a position", secs))?)
            }
            "loop" => Command::Loop,
            "list" => Command::Library,
            "queue" => Command::Queue,
            "add" => Command::Add(position(arg(0))?),
            "remove" => Command::Remove(position(arg(0))?),
            "move" => Command::Move(position(arg(0))?, position(arg(1))?),
            "clear" => Command::Clear,
            "fav" => Command::Fav(position(arg(0))?),
            "favs" => Command::Favs,
            "mode" => match arg(0) {
                Some("next") => Command::Mode { forward: true },
                Some("prev") => Command::Mode { forward: false },
                _ => bail!("expected mode next|prev"),
            },
            "octave" => {
                let shift = required(arg(0), "shift")?;
                Command::Octave(shift.parse().map_err(|_| anyhow!("'{}' is not a shift", shift))?)
            }
            "smart" => Command::Smart(switch(arg(0))?),
            "playlist" => Self::parse_playlist(args)?,
            "playlists" => Command::Playlists,
            "import" => Command::Import(rest(args)?),
            "shortcut" => Command::Shortcut(required(arg(0), "action")?.parse()?),
            "keys" => Command::TestKeys,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{}' (try help)", other),
        };
        Ok(command)
    }

    fn parse_playlist(args: &[&str]) -> Result<Self> {
        let Some((&sub, args)) = args.split_first() else {
            bail!("expected playlist new|save|add|load|rm|rename");
        };
        let id = || required(args.first().copied(), "playlist id").map(str::to_string);

        let command = match sub {
            "new" => Command::PlaylistNew(rest(args)?),
            "save" => Command::PlaylistSave(rest(args)?),
            "add" => Command::PlaylistAdd(id()?, position(args.get(1).copied())?),
            "load" => Command::PlaylistLoad(id()?),
            "rm" => Command::PlaylistRemove(id()?),
            "rename" => Command::PlaylistRename(id()?, rest(args.get(1..).unwrap_or_default())?),
            other => bail!("unknown playlist command '{}'", other),
        };
        Ok(command)
    }
}
