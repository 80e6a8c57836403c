//! Command-line argument parsing and help for burrow.
//!
//! `bw` takes a command (`cp`, `mv`, `rm`, `chmod`) followed by flags and paths.
//! Parsing is kept separate from printing so it can be tested: [parse_args] returns a
//! [CliAction] or an error message and [handle_args] reports it.

use std::path::PathBuf;

use crate::config::Config;
use crate::core::task::{ChmodSpec, TaskFlags, TaskKind};
use crate::utils::{parse_id, parse_mode};

/// A fully parsed operation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: TaskKind,
    pub flags: TaskFlags,
    pub paths: Vec<PathBuf>,
    pub dest: Option<PathBuf>,
    pub chmod: ChmodSpec,
    pub headless: bool,
}

impl Request {
    fn new(kind: TaskKind) -> Self {
        Request {
            kind,
            flags: TaskFlags::NONE,
            paths: Vec::new(),
            dest: None,
            chmod: ChmodSpec::default(),
            headless: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliAction {
    Run(Request),
    Init,
    Help,
    Version,
}

/// Read `std::env::args` and handle the informational flags.
///
/// Returns `None` when there is nothing left to run, with the exit code to use.
pub fn handle_args() -> Result<Option<Request>, i32> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match parse_args(&args) {
        Ok(CliAction::Run(req)) => Ok(Some(req)),
        Ok(CliAction::Help) => {
            print_help();
            Ok(None)
        }
        Ok(CliAction::Version) => {
            print_version();
            Ok(None)
        }
        Ok(CliAction::Init) => {
            let path = Config::default_path();
            match Config::generate_default(&path) {
                Ok(()) => Ok(None),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    Err(1)
                }
            }
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("Try --help for available options");
            Err(2)
        }
    }
}

/// Parse arguments without the program name.
pub fn parse_args(args: &[String]) -> Result<CliAction, String> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(CliAction::Help);
    };

    let kind = match command.as_str() {
        "-h" | "--help" | "help" => return Ok(CliAction::Help),
        "-v" | "--version" => return Ok(CliAction::Version),
        "--init" => return Ok(CliAction::Init),
        "cp" | "copy" => TaskKind::Copy,
        "mv" | "move" => TaskKind::Move,
        "rm" | "remove" => TaskKind::Remove,
        "chmod" => TaskKind::Chmod,
        other => return Err(format!("unknown command '{}'", other)),
    };

    let mut req = Request::new(kind);
    let mut recursive = false;
    let mut positional = Vec::new();
    let mut options_done = false;
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        if options_done || !arg.starts_with('-') || arg == "-" {
            positional.push(PathBuf::from(arg));
            continue;
        }
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", name))
        };

        match (kind, arg.as_str()) {
            (_, "--") => options_done = true,
            (_, "-y" | "--yes") => req.headless = true,
            (TaskKind::Copy | TaskKind::Move, "-s" | "--skip") => {
                req.flags |= TaskFlags::SKIP_CONFLICTS
            }
            (TaskKind::Copy | TaskKind::Move, "-o" | "--overwrite") => {
                req.flags |= TaskFlags::OVERWRITE_CONFLICTS
            }
            (TaskKind::Copy, "-L" | "--dereference") => req.flags |= TaskFlags::DEREF_LINKS,
            (TaskKind::Copy | TaskKind::Move, "--raw-links") => {
                req.flags |= TaskFlags::RAW_LINKS
            }
            (TaskKind::Copy | TaskKind::Move | TaskKind::Remove, "--skip-links") => {
                req.flags |= TaskFlags::SKIP_LINKS
            }
            (TaskKind::Chmod, "-R" | "--recursive") => recursive = true,
            (TaskKind::Chmod, "--set") => req.chmod.set = parse_mode(&value("--set")?)?,
            (TaskKind::Chmod, "--clear") => req.chmod.clear = parse_mode(&value("--clear")?)?,
            (TaskKind::Chmod, "--owner") => req.chmod.owner = Some(parse_id(&value("--owner")?)?),
            (TaskKind::Chmod, "--group") => req.chmod.group = Some(parse_id(&value("--group")?)?),
            (_, other) => return Err(format!("unknown option '{}' for {}", other, command)),
        }
    }

    if req.flags.contains(TaskFlags::SKIP_CONFLICTS)
        && req.flags.contains(TaskFlags::OVERWRITE_CONFLICTS)
    {
        return Err("--skip and --overwrite cannot be combined".into());
    }
    if recursive {
        req.flags |= TaskFlags::RECURSIVE_CHMOD;
    }

    match kind {
        TaskKind::Copy | TaskKind::Move => {
            if positional.len() < 2 {
                return Err(format!("{} needs at least one SOURCE and a DEST", command));
            }
            req.dest = positional.pop();
        }
        TaskKind::Chmod if req.chmod.is_noop() => {
            return Err("chmod needs at least one of --set, --clear, --owner, --group".into());
        }
        _ if positional.is_empty() => {
            return Err(format!("{} needs at least one PATH", command));
        }
        _ => {}
    }
    req.paths = positional;
    Ok(CliAction::Run(req))
}

fn print_version() {
    println!("burrow {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!(
        r#"burrow - resumable bulk copy, move, remove and chmod with a live progress view

USAGE:
  bw cp [FLAGS] SOURCE... DEST
  bw mv [FLAGS] SOURCE... DEST
  bw rm [FLAGS] PATH...
  bw chmod [-R] [--set MODE] [--clear MODE] [--owner UID] [--group GID] PATH...

COPY / MOVE FLAGS:
  -s, --skip              Keep existing destinations
  -o, --overwrite         Replace existing destinations
  -L, --dereference       Copy what symlinks point to (cp only)
      --raw-links         Copy symlink targets verbatim
      --skip-links        Ignore symlinks (also for rm)

CHMOD FLAGS:
  -R, --recursive         Apply to every entry below PATH
      --set MODE          Octal bits to add, e.g. 111
      --clear MODE        Octal bits to remove, e.g. 022
      --owner UID         New numeric owner
      --group GID         New numeric group

COMMON:
  -y, --yes               Run without the progress view or prompts

OPTIONS:
      --init              Generate the default configuration
  -h, --help              Print help information
  -v, --version           Display the installed version of burrow

KEYS:
  q, Esc, Ctrl-C          Cancel the running operation
  s / o / a               Skip, overwrite or abort when asked about conflicts

ENVIRONMENT:
  BW_CONFIG               Override the default config path
  BW_LOG                  Enable file logging with a filter such as "debug"
"#
    );
}
