//! # Live Console
//!
//! Line commands that create and edit drawables while the renderer is
//! drawing them.
//!
//! ```text
//! > add orbiter o            o circles the middle of the screen
//! > set o radius 4           next frame shows the smaller square
//! > moon m o                 m circles o
//! > bg none                  trails
//! > set o radius -4          render thread faults; console keeps going
//! > status                   shows the fault
//! ```
//!
//! Parsing ([`Command`]) and applying ([`Session::apply`]) are separate so
//! both can be tested without a terminal.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use liveloop_core::{Color, DrawError, Shared, SharedDrawable};
use liveloop_rendering::{RendererError, ThreadedRenderer};
use thiserror::Error;
use tracing::debug;

use crate::drawables::{FieldError, Orbiter, Pulsar, Satellite, Tunable};

/// Shown by `help`.
pub const HELP: &str = "\
commands:
  add orbiter|pulsar <name>   create a drawable and start drawing it
  moon <name> <anchor>        create a satellite circling orbiter <anchor>
  set <name> <field> <value>  change a field (e.g. set o radius 4)
  remove <name>               stop drawing <name> and forget it
                              (refused while a moon circles it)
  bg <color>|none             background color, or none for trails
  fps <n>                     frame rate cap
  list                        drawables and their fields
  status                      renderer state and last fault
  stop | start                stop or restart the render thread
  help                        this text
  quit                        exit";

/// Errors reported back to the console user. None of them end the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// First word is not a command.
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    /// Right command, wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// No drawable has that name.
    #[error("no drawable named '{0}'")]
    NoSuchName(String),

    /// A drawable already has that name.
    #[error("the name '{0}' is already taken")]
    NameTaken(String),

    /// `moon` was given an anchor that is not an orbiter.
    #[error("'{0}' is not an orbiter")]
    NotAnOrbiter(String),

    /// `remove` on an orbiter that satellites are still anchored to.
    #[error("'{name}' is the anchor of {moons}; remove them first")]
    HasMoons {
        /// The orbiter.
        name: String,
        /// Its satellites, comma separated.
        moons: String,
    },

    /// `fps` was not a positive integer.
    #[error("'{0}' is not a frame rate")]
    BadFps(String),

    /// A field could not be set.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A color could not be parsed.
    #[error(transparent)]
    Draw(#[from] DrawError),

    /// The renderer refused.
    #[error(transparent)]
    Renderer(#[from] RendererError),
}

/// Drawable kinds `add` can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// [`Orbiter`]
    Orbiter,
    /// [`Pulsar`]
    Pulsar,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `add orbiter|pulsar <name>`
    Add {
        /// What to create.
        kind: EntityKind,
        /// Name to register it under.
        name: String,
    },
    /// `moon <name> <anchor>`
    Moon {
        /// Name of the new satellite.
        name: String,
        /// Name of the orbiter it circles.
        anchor: String,
    },
    /// `set <name> <field> <value>`
    Set {
        /// Drawable name.
        name: String,
        /// Field name.
        field: String,
        /// Unparsed value text (may contain spaces).
        value: String,
    },
    /// `remove <name>`
    Remove(String),
    /// `bg <color>|none`
    Background(Option<Color>),
    /// `fps <n>`
    Fps(u32),
    /// `list`
    List,
    /// `status`
    Status,
    /// `stop`
    Stop,
    /// `start`
    Start,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
}

impl FromStr for Command {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(ConsoleError::Usage("help"));
        };

        let command = match (verb.to_ascii_lowercase().as_str(), args) {
            ("add", [kind, name]) => {
                let kind = match kind.to_ascii_lowercase().as_str() {
                    "orbiter" => EntityKind::Orbiter,
                    "pulsar" => EntityKind::Pulsar,
                    _ => return Err(ConsoleError::Usage("add orbiter|pulsar <name>")),
                };
                Self::Add {
                    kind,
                    name: (*name).to_owned(),
                }
            }
            ("add", _) => return Err(ConsoleError::Usage("add orbiter|pulsar <name>")),
            ("moon", [name, anchor]) => Self::Moon {
                name: (*name).to_owned(),
                anchor: (*anchor).to_owned(),
            },
            ("moon", _) => return Err(ConsoleError::Usage("moon <name> <anchor>")),
            ("set", [name, field, value @ ..]) if !value.is_empty() => Self::Set {
                name: (*name).to_owned(),
                field: field.to_ascii_lowercase(),
                value: value.join(" "),
            },
            ("set", _) => return Err(ConsoleError::Usage("set <name> <field> <value>")),
            ("remove" | "rm", [name]) => Self::Remove((*name).to_owned()),
            ("remove" | "rm", _) => return Err(ConsoleError::Usage("remove <name>")),
            ("bg", [none]) if none.eq_ignore_ascii_case("none") => Self::Background(None),
            ("bg", color @ [_, ..]) => Self::Background(Some(color.join(" ").parse()?)),
            ("bg", []) => return Err(ConsoleError::Usage("bg <color>|none")),
            ("fps", [n]) => Self::Fps(
                n.parse()
                    .map_err(|_| ConsoleError::BadFps((*n).to_owned()))?,
            ),
            ("fps", _) => return Err(ConsoleError::Usage("fps <n>")),
            ("list" | "ls", []) => Self::List,
            ("status", []) => Self::Status,
            ("stop", []) => Self::Stop,
            ("start", []) => Self::Start,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(ConsoleError::UnknownCommand(line.trim().to_owned())),
        };
        Ok(command)
    }
}

/// A named drawable, keeping its concrete type for field edits.
#[derive(Debug, Clone)]
pub enum Entity {
    /// An [`Orbiter`].
    Orbiter(Shared<Orbiter>),
    /// A [`Pulsar`].
    Pulsar(Shared<Pulsar>),
    /// A [`Satellite`].
    Satellite(Shared<Satellite>),
}

impl Entity {
    /// Type-erased handle for the renderer.
    #[must_use]
    pub fn to_dyn(&self) -> SharedDrawable {
        match self {
            Self::Orbiter(o) => o.to_dyn(),
            Self::Pulsar(p) => p.to_dyn(),
            Self::Satellite(s) => s.to_dyn(),
        }
    }

    /// Runs `f` with the drawable locked.
    pub fn with_tunable<R>(&self, f: impl FnOnce(&mut dyn Tunable) -> R) -> R {
        match self {
            Self::Orbiter(o) => f(&mut *o.lock()),
            Self::Pulsar(p) => f(&mut *p.lock()),
            Self::Satellite(s) => f(&mut *s.lock()),
        }
    }

    fn remove_from(&self, renderer: &ThreadedRenderer) -> bool {
        match self {
            Self::Orbiter(o) => renderer.remove(o),
            Self::Pulsar(p) => renderer.remove(p),
            Self::Satellite(s) => renderer.remove(s),
        }
    }
}

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the message (if any) and read the next line.
    Continue(String),
    /// End the session.
    Quit,
}

impl Outcome {
    fn say(message: impl Into<String>) -> Result<Self, ConsoleError> {
        Ok(Self::Continue(message.into()))
    }
}

/// A renderer plus the drawables created from the console, by name.
pub struct Session {
    renderer: ThreadedRenderer,
    entities: BTreeMap<String, Entity>,
}

impl Session {
    /// Wraps `renderer`. It may be running or stopped.
    #[must_use]
    pub fn new(renderer: ThreadedRenderer) -> Self {
        Self {
            renderer,
            entities: BTreeMap::new(),
        }
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &ThreadedRenderer {
        &self.renderer
    }

    /// Registers `entity` under `name` and appends it to the draw list.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::NameTaken`] if `name` is in use.
    pub fn insert(&mut self, name: &str, entity: Entity) -> Result<(), ConsoleError> {
        if self.entities.contains_key(name) {
            return Err(ConsoleError::NameTaken(name.to_owned()));
        }
        self.renderer.push(entity.to_dyn());
        self.entities.insert(name.to_owned(), entity);
        Ok(())
    }

    /// Looks up a drawable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Typed handle on the orbiter called `name`.
    #[must_use]
    pub fn orbiter(&self, name: &str) -> Option<Shared<Orbiter>> {
        match self.entities.get(name) {
            Some(Entity::Orbiter(o)) => Some(o.clone()),
            _ => None,
        }
    }

    /// Parses and applies one line. Blank lines do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] for anything the user should fix.
    pub fn execute(&mut self, line: &str) -> Result<Outcome, ConsoleError> {
        if line.trim().is_empty() {
            return Outcome::say("");
        }
        let command: Command = line.parse()?;
        debug!("console: {command:?}");
        self.apply(command)
    }

    /// Applies a parsed command.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] for unknown names, bad values or a renderer
    /// refusal.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, ConsoleError> {
        match command {
            Command::Add { kind, name } => {
                let entity = match kind {
                    EntityKind::Orbiter => Entity::Orbiter(Shared::new(Orbiter::default())),
                    EntityKind::Pulsar => Entity::Pulsar(Shared::new(Pulsar::default())),
                };
                self.insert(&name, entity)?;
                Outcome::say(format!("added {name}"))
            }
            Command::Moon { name, anchor } => {
                let Some(target) = self.orbiter(&anchor) else {
                    return Err(if self.entities.contains_key(&anchor) {
                        ConsoleError::NotAnOrbiter(anchor)
                    } else {
                        ConsoleError::NoSuchName(anchor)
                    });
                };
                self.insert(&name, Entity::Satellite(Shared::new(Satellite::new(target))))?;
                Outcome::say(format!("{name} now circles {anchor}"))
            }
            Command::Set { name, field, value } => {
                let entity = self.lookup(&name)?;
                entity.with_tunable(|t| t.set_field(&field, &value))?;
                Outcome::say("")
            }
            Command::Remove(name) => {
                let moons = self.moons_of(&name);
                if !moons.is_empty() {
                    return Err(ConsoleError::HasMoons {
                        name,
                        moons: moons.join(", "),
                    });
                }
                let entity = self
                    .entities
                    .remove(&name)
                    .ok_or_else(|| ConsoleError::NoSuchName(name.clone()))?;
                entity.remove_from(&self.renderer);
                Outcome::say(format!("removed {name}"))
            }
            Command::Background(color) => {
                self.renderer.set_background(color);
                Outcome::say("")
            }
            Command::Fps(fps) => {
                self.renderer.set_fps(fps)?;
                Outcome::say("")
            }
            Command::List => Outcome::say(self.list()),
            Command::Status => Outcome::say(self.status()),
            Command::Stop => {
                self.renderer.stop();
                Outcome::say(format!("stopped after {} frames", self.renderer.frame_count()))
            }
            Command::Start => {
                self.renderer.start()?;
                Outcome::say("started")
            }
            Command::Help => Outcome::say(HELP),
            Command::Quit => Ok(Outcome::Quit),
        }
    }

    fn lookup(&self, name: &str) -> Result<&Entity, ConsoleError> {
        self.entities
            .get(name)
            .ok_or_else(|| ConsoleError::NoSuchName(name.to_owned()))
    }

    /// Names of the satellites anchored to the orbiter called `name`.
    fn moons_of(&self, name: &str) -> Vec<&str> {
        let Some(anchor) = self.orbiter(name) else {
            return Vec::new();
        };
        self.entities
            .iter()
            .filter_map(|(moon, entity)| match entity {
                Entity::Satellite(s) if s.lock().anchor.same_object(&anchor) => Some(moon.as_str()),
                _ => None,
            })
            .collect()
    }

    fn list(&self) -> String {
        if self.entities.is_empty() {
            return "(nothing)".to_owned();
        }
        let mut out = String::new();
        for (name, entity) in &self.entities {
            let (kind, fields) = entity.with_tunable(|t| (t.kind(), t.describe()));
            let _ = writeln!(out, "{name} [{kind}] {fields}");
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn status(&self) -> String {
        let r = &self.renderer;
        let stats = r.stats();
        let background = r.background().map_or_else(|| "none".to_owned(), |c| c.to_string());
        let mut out = format!(
            "{} | frames {} | fps {} | bg {} | {} drawables | avg {}us worst {}us late {}",
            if r.is_running() { "running" } else { "stopped" },
            r.frame_count(),
            r.fps(),
            background,
            r.len(),
            stats.avg_frame_us,
            stats.worst_frame_us,
            stats.late_frames,
        );
        if let Some(fault) = r.last_error() {
            let _ = write!(out, "\nlast fault: {fault}");
        }
        out
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("renderer", &self.renderer)
            .field("names", &self.entities.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reads commands from `input` until `quit` or end of input, writing
/// replies and errors to `output`.
///
/// # Errors
///
/// Returns an I/O error from `input` or `output` only; command errors are
/// printed and the loop continues.
pub fn run(session: &mut Session, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    write!(output, "> ")?;
    output.flush()?;
    for line in input.lines() {
        match session.execute(&line?) {
            Ok(Outcome::Quit) => return Ok(()),
            Ok(Outcome::Continue(message)) if message.is_empty() => {}
            Ok(Outcome::Continue(message)) => writeln!(output, "{message}")?,
            Err(error) => writeln!(output, "error: {error}")?,
        }
        write!(output, "> ")?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveloop_rendering::RendererConfig;

    fn session() -> Session {
        let (renderer, _probe) = ThreadedRenderer::headless(&RendererConfig::default()).unwrap();
        Session::new(renderer)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "add orbiter o".parse(),
            Ok(Command::Add {
                kind: EntityKind::Orbiter,
                name: "o".to_owned()
            })
        );
        assert_eq!(
            "set o color 200, 0, 255".parse(),
            Ok(Command::Set {
                name: "o".to_owned(),
                field: "color".to_owned(),
                value: "200, 0, 255".to_owned()
            })
        );
        assert_eq!("bg none".parse(), Ok(Command::Background(None)));
        assert_eq!("bg #ff0000".parse(), Ok(Command::Background(Some(Color::RED))));
        assert_eq!("fps 60".parse(), Ok(Command::Fps(60)));
        assert_eq!("  quit ".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "dance".parse::<Command>(),
            Err(ConsoleError::UnknownCommand(_))
        ));
        assert!(matches!("add dragon d".parse::<Command>(), Err(ConsoleError::Usage(_))));
        assert!(matches!("set o radius".parse::<Command>(), Err(ConsoleError::Usage(_))));
        assert!(matches!("fps fast".parse::<Command>(), Err(ConsoleError::BadFps(_))));
        assert!(matches!(
            "bg plaid".parse::<Command>(),
            Err(ConsoleError::Draw(DrawError::InvalidColor(_)))
        ));
    }

    #[test]
    fn test_add_set_remove() {
        let mut s = session();
        s.execute("add orbiter o").unwrap();
        assert_eq!(s.renderer().len(), 1);

        s.execute("set o radius 4").unwrap();
        assert!((s.orbiter("o").unwrap().lock().radius - 4.0).abs() < f64::EPSILON);

        assert_eq!(
            s.execute("add pulsar o"),
            Err(ConsoleError::NameTaken("o".to_owned()))
        );

        s.execute("remove o").unwrap();
        assert!(s.renderer().is_empty());
        assert!(matches!(s.execute("set o radius 1"), Err(ConsoleError::NoSuchName(_))));
    }

    #[test]
    fn test_moon_needs_orbiter_anchor() {
        let mut s = session();
        s.execute("add pulsar p").unwrap();
        assert_eq!(
            s.execute("moon m p"),
            Err(ConsoleError::NotAnOrbiter("p".to_owned()))
        );
        assert_eq!(
            s.execute("moon m x"),
            Err(ConsoleError::NoSuchName("x".to_owned()))
        );

        s.execute("add orbiter o").unwrap();
        s.execute("moon m o").unwrap();
        assert!(matches!(s.get("m"), Some(Entity::Satellite(_))));
        assert_eq!(s.renderer().len(), 3);
    }

    #[test]
    fn test_remove_refuses_anchor_with_moons() {
        let mut s = session();
        s.execute("add orbiter o").unwrap();
        s.execute("moon m1 o").unwrap();
        s.execute("moon m2 o").unwrap();

        assert_eq!(
            s.execute("remove o"),
            Err(ConsoleError::HasMoons {
                name: "o".to_owned(),
                moons: "m1, m2".to_owned()
            })
        );
        assert!(s.orbiter("o").is_some());
        assert_eq!(s.renderer().len(), 3);

        s.execute("remove m1").unwrap();
        s.execute("rm m2").unwrap();
        s.execute("remove o").unwrap();
        assert!(s.renderer().is_empty());
    }

    #[test]
    fn test_settings_commands() {
        let mut s = session();
        s.execute("bg none").unwrap();
        assert_eq!(s.renderer().background(), None);
        s.execute("fps 12").unwrap();
        assert_eq!(s.renderer().fps(), 12);
        assert!(matches!(
            s.execute("fps 0"),
            Err(ConsoleError::Renderer(RendererError::Config(_)))
        ));
    }

    #[test]
    fn test_list_and_status_text() {
        let mut s = session();
        assert_eq!(s.execute("list"), Ok(Outcome::Continue("(nothing)".to_owned())));
        s.execute("add orbiter o").unwrap();
        let Ok(Outcome::Continue(listing)) = s.execute("list") else {
            panic!("list failed");
        };
        assert!(listing.starts_with("o [orbiter] center=(64.0,64.0)"));

        let Ok(Outcome::Continue(status)) = s.execute("status") else {
            panic!("status failed");
        };
        assert!(status.starts_with("stopped | frames 0 | fps 30 | bg #000000 | 1 drawables"));
    }

    #[test]
    fn test_run_reads_until_quit() {
        let mut s = session();
        let input = b"add orbiter o\nbogus\nquit\nadd orbiter never\n";
        let mut output = Vec::new();
        run(&mut s, &input[..], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("added o"));
        assert!(text.contains("error: unknown command 'bogus'"));
        assert!(s.get("never").is_none());
    }
}
