use std::path::PathBuf;

use tracing::{debug, info};

use crate::{
    outside::{Action, Launcher},
    result::Result,
};

pub const NOT_RECOGNIZED: &str = "Command not recognized";

/// One entry of the dispatch table: when the lower-cased command contains
/// `pattern`, perform `action` and answer `reply`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub label: &'static str,
    pub pattern: &'static str,
    pub action: Action,
    pub reply: &'static str,
}

impl Rule {
    fn matches(&self, command: &str) -> bool {
        command.contains(self.pattern)
    }
}

/// Maps free-text phrases to desktop actions.
///
/// Rules are tried in order and the first one matching wins.
pub struct Dispatcher<L> {
    rules: Vec<Rule>,
    launcher: L,
}

impl<L: Launcher> Dispatcher<L> {
    /// Dispatcher with the built-in rules.
    /// `editor` is the program started by "open vs code".
    pub fn new(launcher: L, editor: &str) -> Self {
        Self::with_rules(launcher, default_rules(editor))
    }

    pub fn with_rules(launcher: L, rules: Vec<Rule>) -> Self {
        Self { rules, launcher }
    }

    /// Run the action matching the command and return a status message for the user.
    ///
    /// An unknown command is not an error: it gets [`NOT_RECOGNIZED`] as answer
    /// and nothing is performed. Blank input is just another unknown command.
    pub fn execute(&self, command: &str) -> Result<String> {
        let command = command.to_lowercase();
        let Some(rule) = self.rules.iter().find(|rule| rule.matches(&command)) else {
            debug!("No rule matches {command:?}");
            return Ok(NOT_RECOGNIZED.to_owned());
        };

        info!("Command {command:?} matched rule '{}'", rule.label);
        self.launcher.perform(&rule.action)?;

        Ok(rule.reply.to_owned())
    }

    /// Labels of the commands the dispatcher understands, in matching order
    pub fn available_commands(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|rule| rule.label)
    }
}

fn default_rules(editor: &str) -> Vec<Rule> {
    vec![
        Rule {
            label: "Open YouTube",
            pattern: "open youtube",
            action: Action::OpenUrl("https://youtube.com".to_owned()),
            reply: "Opening YouTube...",
        },
        Rule {
            label: "Open Instagram",
            pattern: "open instagram",
            action: Action::OpenUrl("https://instagram.com".to_owned()),
            reply: "Opening Instagram...",
        },
        Rule {
            label: "Open Downloads",
            pattern: "open downloads",
            action: Action::OpenFolder(downloads_dir()),
            reply: "Opening Downloads folder...",
        },
        Rule {
            label: "Open File Explorer",
            pattern: "open file explorer",
            action: file_manager(),
            reply: "Opening File Explorer...",
        },
        Rule {
            label: "Open VS Code",
            pattern: "open vs code",
            action: Action::Spawn {
                program: editor.to_owned(),
                args: vec![],
            },
            reply: "Opening VS Code...",
        },
    ]
}

fn downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn file_manager() -> Action {
    let home = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .display()
        .to_string();

    if cfg!(target_os = "windows") {
        Action::Spawn {
            program: "explorer".to_owned(),
            args: vec![],
        }
    } else if cfg!(target_os = "macos") {
        Action::Spawn {
            program: "open".to_owned(),
            args: vec![home],
        }
    } else {
        Action::Spawn {
            program: "xdg-open".to_owned(),
            args: vec![home],
        }
    }
}
