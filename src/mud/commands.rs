//! Command tokenizing and the two-tier verb tables.
//!
//! A handler never touches world state. It looks at its arguments and returns
//! [`Effect`]s, which the player's command loop then performs in order against
//! the room and the registry. Lookup goes to the process-wide table first and
//! then to the current room's local table.

use std::collections::HashMap;
use std::fmt;

use super::types::{PlayerId, RoomId};

/// Most tokens a single line is split into.
pub const MAX_TOKENS: usize = 10;

/// Split a raw line into tokens; the first token is the verb.
///
/// Whitespace separates tokens. A run wrapped in matching `'` or `"` quotes is
/// one token without its quotes. Blank input gives an empty vector.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while tokens.len() < MAX_TOKENS {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };
        let mut token = String::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == first {
                    closed = true;
                    break;
                }
                token.push(c);
            }
            if !closed {
                token.insert(0, first);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }
    tokens
}

/// How `rewrite` changes a room's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    All,
    Append,
    Prepend,
}

/// Work a command asks its session to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send text straight back to the acting player.
    Write(String),
    /// Describe the room, or examine one target.
    Look(Option<String>),
    Who,
    Say(String),
    Take(String),
    Drop(String),
    Go(String),
    Inventory,
    Quit,
    Pioneer(String),
    Rewrite(RewriteMode, String),
}

/// What a handler may know about the session that invoked it.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub player: PlayerId,
    pub name: String,
    pub room: RoomId,
}

pub type CommandHandler = fn(&CommandContext, &[String]) -> Vec<Effect>;

/// Verb → handler map. Verbs are stored and looked up in lowercase.
#[derive(Clone, Default)]
pub struct CommandTable {
    handlers: HashMap<String, CommandHandler>,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut verbs: Vec<_> = self.handlers.keys().collect();
        verbs.sort();
        f.debug_set().entries(verbs).finish()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide verbs every session understands.
    pub fn standard() -> Self {
        Self::new()
            .with("look", cmd_look)
            .with("who", cmd_who)
            .with("say", cmd_say)
            .with("take", cmd_take)
            .with("drop", cmd_drop)
            .with("go", cmd_go)
            .with("inv", cmd_inv)
            .with("quit", cmd_quit)
            .with("pioneer", cmd_pioneer)
            .with("rewrite", cmd_rewrite)
    }

    pub fn with(mut self, verb: &str, handler: CommandHandler) -> Self {
        self.insert(verb, handler);
        self
    }

    pub fn insert(&mut self, verb: &str, handler: CommandHandler) {
        self.handlers.insert(verb.to_lowercase(), handler);
    }

    pub fn get(&self, verb: &str) -> Option<CommandHandler> {
        self.handlers.get(&verb.to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Outcome of looking a verb up in both tiers.
pub fn dispatch(
    global: &CommandTable,
    local: &CommandTable,
    ctx: &CommandContext,
    tokens: &[String],
) -> Vec<Effect> {
    let Some((verb, args)) = tokens.split_first() else {
        return Vec::new();
    };
    match global.get(verb).or_else(|| local.get(verb)) {
        Some(handler) => handler(ctx, args),
        None => vec![Effect::Write(format!("Command '{}' not recognized.\n", verb))],
    }
}

fn usage(text: &str) -> Vec<Effect> {
    vec![Effect::Write(text.to_string())]
}

fn cmd_look(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    match args {
        [] => vec![Effect::Look(None)],
        [target] => vec![Effect::Look(Some(target.clone()))],
        _ => usage("Too many args. Usage: look [target]\n"),
    }
}

fn cmd_who(_ctx: &CommandContext, _args: &[String]) -> Vec<Effect> {
    vec![Effect::Who]
}

fn cmd_say(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    if args.is_empty() {
        return usage("Say what?\n");
    }
    vec![Effect::Say(args.join(" "))]
}

fn cmd_take(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    match args.first() {
        Some(target) => vec![Effect::Take(target.to_lowercase())],
        None => usage("Take objects by typing 'take [object name]'.\n"),
    }
}

fn cmd_drop(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    match args.first() {
        Some(target) => vec![Effect::Drop(target.to_lowercase())],
        None => usage("Drop objects by typing 'drop [object name]'.\n"),
    }
}

fn cmd_go(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    match args.first() {
        Some(dir) => vec![Effect::Go(dir.clone())],
        None => usage("Go usage: go [exit name]. Ex. go north\n"),
    }
}

fn cmd_inv(_ctx: &CommandContext, _args: &[String]) -> Vec<Effect> {
    vec![Effect::Inventory]
}

fn cmd_quit(_ctx: &CommandContext, _args: &[String]) -> Vec<Effect> {
    vec![Effect::Quit]
}

fn cmd_pioneer(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    match args.first() {
        Some(dir) => vec![Effect::Pioneer(dir.clone())],
        None => usage("Pioneer usage: pioneer [direction]. Ex. pioneer east\n"),
    }
}

fn cmd_rewrite(_ctx: &CommandContext, args: &[String]) -> Vec<Effect> {
    let Some((mode, rest)) = args.split_first() else {
        return usage("Rewrite usage: rewrite all|append|prepend [text]\n");
    };
    let mode = match mode.to_lowercase().as_str() {
        "all" => RewriteMode::All,
        "append" => RewriteMode::Append,
        "prepend" => RewriteMode::Prepend,
        _ => return usage("Rewrite subcommand not recognized.\n"),
    };
    vec![Effect::Rewrite(mode, rest.join(" "))]
}
