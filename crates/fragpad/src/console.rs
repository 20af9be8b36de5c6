//! Line-oriented command console on stdin.
//!
//! Each line is parsed here and forwarded to the window's event loop; the
//! session applies it there, so this thread never touches playground state.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use composer::{validate_identifier, FilterMode, WrapMode};
use renderer::{Command, EventLoopProxy, TextureRequest, UserEvent};
use sizing::{Axis, Pair};

pub const HELP: &str = "\
commands:
  texture <path> [name]         load an image as a texture (default name texN)
  color [name] [#hex]           add or update a color (default colN, #000000)
  rename <from> <to>            rename a texture or color
  wrap <texture> clamp|repeat   set the texture wrap mode
  filter <texture> nearest|linear
                                set the texture filter
  remove <name>                 remove a texture or color
  output-width <expr>           set the output width (e.g. 1920 / 2)
  output-height <expr>          set the output height
  display-width <expr>          set the display width
  display-height <expr>         set the display height
  lock-output on|off            keep the output aspect ratio
  lock-display on|off           keep the display aspect ratio
  reload                        re-read the shader source and render
  export <path>                 write the current frame as PNG
  list                          show resources and sizes
  help                          show this text
  quit                          close the window";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Run(Command),
    Help,
    Blank,
}

pub fn parse_command(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };
    if keyword.is_empty() {
        return Ok(Input::Blank);
    }
    let args = split_args(rest)?;

    let command = match keyword.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Input::Help),
        "texture" | "load" => {
            let (path, name) = match args.as_slice() {
                [path] => (path, None),
                [path, name] => (path, Some(new_name(name)?)),
                _ => return Err(usage("texture <path> [name]")),
            };
            let mut request = TextureRequest::new(PathBuf::from(path));
            request.name = name;
            Command::AddTexture(request)
        }
        "color" => {
            let (name, color) = match args.as_slice() {
                [] => (None, None),
                [value] if value.starts_with('#') => (None, Some(value.clone())),
                [name] => (Some(new_name(name)?), None),
                [name, color] => (Some(new_name(name)?), Some(color.clone())),
                _ => return Err(usage("color [name] [hex]")),
            };
            Command::SetColor { name, color }
        }
        "rename" => {
            let [from, to] = exact::<2>(&args, "rename <from> <to>")?;
            Command::Rename {
                from: from.clone(),
                to: new_name(to)?,
            }
        }
        "wrap" => {
            let [name, mode] = exact::<2>(&args, "wrap <texture> clamp|repeat")?;
            Command::SetWrap {
                name: name.clone(),
                wrap: mode.parse::<WrapMode>()?,
            }
        }
        "filter" => {
            let [name, mode] = exact::<2>(&args, "filter <texture> nearest|linear")?;
            Command::SetFilter {
                name: name.clone(),
                filter: mode.parse::<FilterMode>()?,
            }
        }
        "remove" | "rm" => {
            let [name] = exact::<1>(&args, "remove <name>")?;
            Command::Remove { name: name.clone() }
        }
        "output-width" => resize(Pair::Output, Axis::Width, rest)?,
        "output-height" => resize(Pair::Output, Axis::Height, rest)?,
        "display-width" => resize(Pair::Display, Axis::Width, rest)?,
        "display-height" => resize(Pair::Display, Axis::Height, rest)?,
        "lock-output" => lock(Pair::Output, &args)?,
        "lock-display" => lock(Pair::Display, &args)?,
        "reload" => Command::Reload,
        "export" => {
            let [path] = exact::<1>(&args, "export <path>")?;
            Command::Export {
                path: PathBuf::from(path),
            }
        }
        "list" | "ls" => Command::List,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(Input::Run(command))
}

/// Reads stdin until EOF, forwarding parsed commands to the event loop.
pub fn spawn(proxy: EventLoopProxy<UserEvent>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("fragpad-console".into())
        .spawn(move || {
            println!("type 'help' for commands");
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!("console read failed: {err}");
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Input::Run(command)) => {
                        if proxy.send_event(UserEvent::Command(command)).is_err() {
                            break;
                        }
                    }
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Blank) => {}
                    Err(message) => eprintln!("error: {message}"),
                }
            }
            tracing::debug!("console closed");
        })
}

fn resize(pair: Pair, axis: Axis, expression: &str) -> Result<Command, String> {
    if expression.is_empty() {
        return Err(usage("<pair>-<axis> <expression>"));
    }
    Ok(Command::Resize {
        pair,
        axis,
        input: expression.to_string(),
    })
}

fn lock(pair: Pair, args: &[String]) -> Result<Command, String> {
    let locked = match args {
        [] => true,
        [value] => match value.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => true,
            "off" | "false" | "no" | "0" => false,
            other => return Err(format!("expected on or off, got '{other}'")),
        },
        _ => return Err(usage("lock-output|lock-display on|off")),
    };
    Ok(Command::Lock { pair, locked })
}

fn new_name(name: &str) -> Result<String, String> {
    validate_identifier(name).map_err(|err| err.to_string())?;
    Ok(name.to_string())
}

fn exact<'a, const N: usize>(args: &'a [String], shape: &str) -> Result<&'a [String; N], String> {
    args.try_into().map_err(|_| usage(shape))
}

fn usage(shape: &str) -> String {
    format!("usage: {shape}")
}

/// Whitespace split that keeps double-quoted runs together.
fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            ch => {
                current.push(ch);
                pending = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if pending {
        args.push(current);
    }
    Ok(args)
}
