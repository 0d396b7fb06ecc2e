//! The ordered `!cmd [args]` pattern list (§4.4).

/// A parsed command. `Dynamic` is the catch-all passed through to the AI
/// CLI's own slash-command dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    Escape,
    Approve,
    Help,
    ReleaseNotes,
    Cd { path: String },
    Worktree { args: String },
    Invite { username: String },
    Kick { username: String },
    PermissionsInteractive,
    /// Upgrading to auto is always rejected at the command boundary (§4.4).
    PermissionsAuto,
    Update { mode: Option<UpdateArg> },
    Context,
    Cost,
    Compact,
    Plugin { args: String },
    Kill,
    Bug { args: String },
    /// `!word [args]` handed to the AI's own slash-command dispatcher.
    Dynamic { word: String, args: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateArg {
    Now,
    Defer,
}

/// Whether a command's AI-output form is in the allow-list (§9 open
/// question: a single registry flag per command rather than two drifting
/// allow-lists).
pub fn ai_can_execute(command: &Command) -> bool {
    matches!(
        command,
        Command::Cd { .. } | Command::Worktree { .. } | Command::Bug { .. }
    )
}

/// Parse the leading `!command [args]` in trimmed user input. Returns `None`
/// if the text doesn't start with `!` or doesn't match any known shape.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Option<Command> {
        let trimmed = input.trim();
        let rest = trimmed.strip_prefix('!')?;
        let (word, args) = split_word(rest);
        let args = args.trim().to_string();

        Some(match word {
            "stop" => Command::Stop,
            "escape" => Command::Escape,
            "approve" => Command::Approve,
            "help" => Command::Help,
            "release-notes" => Command::ReleaseNotes,
            "cd" => Command::Cd { path: args },
            "worktree" => Command::Worktree { args },
            "invite" => Command::Invite {
                username: args.trim_start_matches('@').to_string(),
            },
            "kick" => Command::Kick {
                username: args.trim_start_matches('@').to_string(),
            },
            "permissions" => match args.as_str() {
                "interactive" => Command::PermissionsInteractive,
                "auto" => Command::PermissionsAuto,
                _ => Command::Dynamic {
                    word: word.to_string(),
                    args,
                },
            },
            "update" => {
                let mode = match args.as_str() {
                    "now" => Some(UpdateArg::Now),
                    "defer" => Some(UpdateArg::Defer),
                    _ => None,
                };
                Command::Update { mode }
            }
            "context" => Command::Context,
            "cost" => Command::Cost,
            "compact" => Command::Compact,
            "plugin" => Command::Plugin { args },
            "kill" => Command::Kill,
            "bug" => Command::Bug { args },
            other => Command::Dynamic {
                word: other.to_string(),
                args,
            },
        })
    }

    /// Re-render a parsed command back to its `!cmd args` text form. Used by
    /// the round-trip property test (§8).
    pub fn render(command: &Command) -> String {
        match command {
            Command::Stop => "!stop".into(),
            Command::Escape => "!escape".into(),
            Command::Approve => "!approve".into(),
            Command::Help => "!help".into(),
            Command::ReleaseNotes => "!release-notes".into(),
            Command::Cd { path } => format!("!cd {path}"),
            Command::Worktree { args } => format!("!worktree {args}").trim_end().to_string(),
            Command::Invite { username } => format!("!invite @{username}"),
            Command::Kick { username } => format!("!kick @{username}"),
            Command::PermissionsInteractive => "!permissions interactive".into(),
            Command::PermissionsAuto => "!permissions auto".into(),
            Command::Update { mode } => match mode {
                Some(UpdateArg::Now) => "!update now".into(),
                Some(UpdateArg::Defer) => "!update defer".into(),
                None => "!update".into(),
            },
            Command::Context => "!context".into(),
            Command::Cost => "!cost".into(),
            Command::Compact => "!compact".into(),
            Command::Plugin { args } => format!("!plugin {args}").trim_end().to_string(),
            Command::Kill => "!kill".into(),
            Command::Bug { args } => format!("!bug {args}").trim_end().to_string(),
            Command::Dynamic { word, args } => {
                if args.is_empty() {
                    format!("!{word}")
                } else {
                    format!("!{word} {args}")
                }
            }
        }
    }
}

fn split_word(rest: &str) -> (&str, &str) {
    match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stop() {
        assert_eq!(CommandParser::parse("!stop"), Some(Command::Stop));
    }

    #[test]
    fn permissions_auto_is_rejected_but_still_parses() {
        // The command boundary always rejects upgrading to auto; parsing it
        // still succeeds so the handler can produce a clear refusal message.
        assert_eq!(CommandParser::parse("!permissions auto"), Some(Command::PermissionsAuto));
    }

    #[test]
    fn non_command_text_returns_none() {
        assert_eq!(CommandParser::parse("hello world"), None);
    }

    #[test]
    fn dynamic_catch_all_for_unknown_word() {
        match CommandParser::parse("!review pr 42") {
            Some(Command::Dynamic { word, args }) => {
                assert_eq!(word, "review");
                assert_eq!(args, "pr 42");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parse_then_render_round_trips() {
        for input in ["!stop", "!cd /tmp/foo", "!invite @alice", "!update now", "!bug something broke"] {
            let parsed = CommandParser::parse(input).expect("should parse");
            assert_eq!(CommandParser::render(&parsed), input);
        }
    }

    #[test]
    fn ai_allow_list_excludes_session_control() {
        assert!(!ai_can_execute(&Command::Stop));
        assert!(ai_can_execute(&Command::Cd { path: "x".into() }));
        assert!(ai_can_execute(&Command::Bug { args: "x".into() }));
    }
}
