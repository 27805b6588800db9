use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sfdc-data-removal")]
#[command(about = "Process data removal, unsubscribe and credit card removal requests against Salesforce")]
#[command(version)]
pub struct Cli {
    /// Path to the credentials file
    #[arg(short, long, default_value = "sfdc.ini")]
    pub config: PathBuf,

    /// Working directory for the config file, exports/ and results/
    /// (defaults to the executable's directory)
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    HandleRequests,
    HandleEmailList,
    DeleteFlagged,
    Exit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::HandleRequests,
        MenuAction::HandleEmailList,
        MenuAction::DeleteFlagged,
        MenuAction::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::HandleRequests => "Handle a list of requests",
            MenuAction::HandleEmailList => "Handle a list of email addresses",
            MenuAction::DeleteFlagged => "Delete all flagged records",
            MenuAction::Exit => "Exit",
        }
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(MenuAction::label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["sfdc-data-removal"]);
        assert_eq!(cli.config, PathBuf::from("sfdc.ini"));
        assert!(cli.workdir.is_none());
    }

    #[test]
    fn test_menu_order() {
        assert_eq!(
            MenuAction::labels(),
            vec![
                "Handle a list of requests",
                "Handle a list of email addresses",
                "Delete all flagged records",
                "Exit",
            ]
        );
    }
}
