//! Peels `!cd X`, `!permissions interactive`, `!worktree X` off the front of
//! a first message, returning the remainder for onward processing (§4.4).

/// A stackable command recognized at the start of a first message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackableCommand {
    Cd { path: String },
    PermissionsInteractive,
    Worktree { branch_or_args: String },
}

/// Peel every recognized stackable prefix off the front of `text`, in the
/// order they appear, returning the commands found and the remaining text.
pub fn peel(text: &str) -> (Vec<StackableCommand>, String) {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    let mut found = Vec::new();

    loop {
        let Some(&first) = tokens.first() else { break };
        let Some(word) = first.strip_prefix('!') else { break };

        match word {
            "cd" => {
                let Some(&arg) = tokens.get(1) else { break };
                found.push(StackableCommand::Cd { path: arg.to_string() });
                tokens.drain(0..2);
            }
            "permissions" if tokens.get(1) == Some(&"interactive") => {
                found.push(StackableCommand::PermissionsInteractive);
                tokens.drain(0..2);
            }
            "worktree" => {
                let Some(&arg) = tokens.get(1) else { break };
                found.push(StackableCommand::Worktree {
                    branch_or_args: arg.to_string(),
                });
                tokens.drain(0..2);
            }
            _ => break,
        }
    }

    (found, tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peels_single_cd_prefix() {
        let (commands, remainder) = peel("!cd /tmp/work fix the bug");
        assert_eq!(commands, vec![StackableCommand::Cd { path: "/tmp/work".into() }]);
        assert_eq!(remainder, "fix the bug");
    }

    #[test]
    fn no_prefix_leaves_text_untouched() {
        let (commands, remainder) = peel("just a normal prompt");
        assert!(commands.is_empty());
        assert_eq!(remainder, "just a normal prompt");
    }

    #[test]
    fn stacks_permissions_then_worktree() {
        let (commands, remainder) = peel("!permissions interactive !worktree feature/x do the thing");
        assert_eq!(
            commands,
            vec![
                StackableCommand::PermissionsInteractive,
                StackableCommand::Worktree {
                    branch_or_args: "feature/x".into()
                },
            ]
        );
        assert_eq!(remainder, "do the thing");
    }
}
