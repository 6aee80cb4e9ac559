use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "snote",
    about = "snote: markdown notes with content-addressed attachments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root, overriding the configuration file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Delete blobs no note references
    Gc(GcArgs),
    /// List notes or tags
    Ls(LsArgs),
    /// Check every note parses and every blob matches its ID
    Fsck(FsckArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding the configuration file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Do not run background garbage collection
    #[arg(long)]
    pub no_gc: bool,
}

#[derive(Args)]
pub struct GcArgs {
    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct LsArgs {
    /// List tags instead of notes
    #[arg(short, long)]
    pub tags: bool,
    /// Print the generated listing note as markdown
    #[arg(long)]
    pub markdown: bool,
    /// Only list notes carrying this tag
    #[arg(long, value_name = "TAG", conflicts_with_all = ["tags", "markdown"])]
    pub tag: Option<String>,
}

#[derive(Args)]
pub struct FsckArgs {}

#[derive(Args)]
pub struct ConfigArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["snote", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(!args.no_gc);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["snote", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_gc_dry_run() {
        let cli = Cli::try_parse_from(["snote", "gc", "--dry-run"]).unwrap();
        if let Command::Gc(args) = cli.command {
            assert!(args.dry_run);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_tags() {
        let cli = Cli::try_parse_from(["snote", "ls", "-t"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert!(args.tags);
            assert!(!args.markdown);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_tag_filter() {
        let cli = Cli::try_parse_from(["snote", "ls", "--tag", "home"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.tag.as_deref(), Some("home"));
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["snote", "ls", "--tag", "home", "-t"]).is_err());
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "snote", "fsck", "--root", "/srv/notes", "-c", "snote.toml", "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Fsck(_)));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/notes")));
        assert_eq!(cli.config, Some(PathBuf::from("snote.toml")));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["snote", "--format", "json", "config"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["snote"]).is_err());
    }
}
