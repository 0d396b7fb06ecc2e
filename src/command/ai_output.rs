//! AI-output command parser: a narrow allow-listed subset of commands the
//! AI CLI's own text output may trigger, matched only when a command
//! appears alone on its own line (§4.4).

use super::parser::Command;

/// Scan the AI's rendered output for an allow-listed command on its own
/// line. Returns at most one command — the first line that matches.
pub fn scan(ai_output: &str) -> Option<Command> {
    ai_output.lines().find_map(|line| {
        let trimmed = line.trim();
        if let Some(path) = trimmed.strip_prefix("!cd ") {
            return Some(Command::Cd { path: path.trim().to_string() });
        }
        if trimmed == "!worktree list" {
            return Some(Command::Worktree { args: "list".into() });
        }
        if let Some(args) = trimmed.strip_prefix("!bug ") {
            return Some(Command::Bug { args: args.trim().to_string() });
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_allow_listed_command_on_its_own_line() {
        let output = "Some narration.\n!worktree list\nMore narration.";
        assert_eq!(scan(output), Some(Command::Worktree { args: "list".into() }));
    }

    #[test]
    fn ignores_commands_embedded_mid_sentence() {
        let output = "Run !cd /tmp inline, not on its own line";
        assert_eq!(scan(output), None);
    }

    #[test]
    fn rejects_commands_outside_the_allow_list() {
        let output = "!stop";
        assert_eq!(scan(output), None);
    }
}
