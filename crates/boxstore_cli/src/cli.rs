use boxstore_core::{BoxId, ItemId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "boxstore_cli")]
#[command(about = "Manage boxes and the items they hold.")]
pub struct CommandLine {
    /// JSON config file; `BOXSTORE_*` environment variables are used when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Check that the core library is linked
    Ping,
    /// List every box with its items
    List,
    /// Print the number of boxes
    Count,
    /// Create an empty box and print its id
    AddBox,
    /// Create an item in a box and print its id
    AddItem { box_id: BoxId },
    /// Change the title of a box
    RenameBox { box_id: BoxId, title: String },
    /// Change the title of an item in a box
    RenameItem {
        box_id: BoxId,
        item_id: ItemId,
        title: String,
    },
    /// Delete a box and all of its items
    RemoveBox { box_id: BoxId },
    /// Delete one item from a box
    RemoveItem { box_id: BoxId, item_id: ItemId },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::List => "list",
            Self::Count => "count",
            Self::AddBox => "add-box",
            Self::AddItem { .. } => "add-item",
            Self::RenameBox { .. } => "rename-box",
            Self::RenameItem { .. } => "rename-item",
            Self::RemoveBox { .. } => "remove-box",
            Self::RemoveItem { .. } => "remove-item",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandLine, Commands};
    use boxstore_core::{BoxId, ItemId};
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    fn parse(argv: &[&str]) -> Result<CommandLine, clap::Error> {
        CommandLine::try_parse_from(std::iter::once("boxstore_cli").chain(argv.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn parses_subcommands_with_typed_ids() {
        let cli = parse(&["rename-item", "4", "12", "Spoons"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::RenameItem {
                box_id: BoxId::new(4).unwrap(),
                item_id: ItemId::new(12).unwrap(),
                title: "Spoons".to_string(),
            }
        );
        assert!(cli.config.is_none());
        assert_eq!(cli.command.name(), "rename-item");
    }

    #[test]
    fn config_flag_is_accepted_before_or_after_the_command() {
        let before = parse(&["--config", "/etc/boxstore.json", "count"]).unwrap();
        let after = parse(&["add-item", "7", "--config", "/etc/boxstore.json"]).unwrap();
        assert_eq!(before.config, Some(PathBuf::from("/etc/boxstore.json")));
        assert_eq!(after.config, before.config);
        assert_eq!(
            after.command,
            Commands::AddItem {
                box_id: BoxId::new(7).unwrap()
            }
        );
    }

    #[test]
    fn rejects_missing_command_and_bad_ids() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["remove-box", "-3"]).is_err());
        assert!(parse(&["shelve"]).is_err());
        assert_eq!(
            parse(&["remove-box", "shelf"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["rename-box", "1"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
    }
}
