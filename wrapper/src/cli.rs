//! CLI argument definitions for the gh-mcp wrapper.
//!
//! The wrapper takes no positional arguments or flags of its own: the
//! wrapped server is always run over stdio, and configuration arrives
//! through environment variables. The definition is kept separate from the
//! entrypoint so `--help` and `--version` behaviour can be tested.

use clap::Parser;

/// Run the bundled github-mcp-server over stdio.
#[derive(Parser, Debug, Default)]
#[command(name = "gh-mcp")]
#[command(version, about)]
#[command(long_about = concat!(
    "Run the bundled github-mcp-server over stdio.\n\n",
    "The wrapper verifies the embedded server archive against its pinned ",
    "SHA-256 digest, extracts the executable into a freshly created private ",
    "directory, and runs it as a child wired to this process's standard ",
    "streams. The directory is removed again when the server exits.\n\n",
    "Authentication follows the gh CLI conventions: set GH_TOKEN (or ",
    "GITHUB_TOKEN) and optionally GH_HOST. The server-side variables ",
    "GITHUB_TOOLSETS, GITHUB_TOOLS, GITHUB_DYNAMIC_TOOLSETS, ",
    "GITHUB_READ_ONLY, and GITHUB_LOCKDOWN_MODE are passed through when ",
    "set. LOG_LEVEL controls wrapper diagnostics on stderr.",
))]
pub struct Cli {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_no_arguments() {
        Cli::try_parse_from(["gh-mcp"]).expect("no arguments accepted");
    }

    #[test]
    fn rejects_unexpected_arguments() {
        let err = Cli::try_parse_from(["gh-mcp", "serve"]).expect_err("unexpected argument");
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
