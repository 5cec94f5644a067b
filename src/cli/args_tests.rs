//! Tests for CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use super::{Cli, Command, DEFAULT_SCHEMA_FILE};

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_args() {
        let cli = Cli::parse_from_iter(["paramtree", "--schema", "app.toml"]);

        assert_eq!(cli.schema, Some(PathBuf::from("app.toml")));
        assert!(!cli.watch);
        assert!(!cli.verbose);
        assert!(cli.args.is_empty());
        assert!(!cli.is_init());
    }

    #[test]
    fn trailing_args_are_passed_through() {
        let cli = Cli::parse_from_iter([
            "paramtree",
            "-s",
            "app.toml",
            "--",
            "serve",
            "-Port=8080",
            "--verbose",
        ]);

        assert_eq!(cli.args, ["serve", "-Port=8080", "--verbose"]);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_watch_options() {
        let cli = Cli::parse_from_iter([
            "paramtree",
            "--schema",
            "app.toml",
            "--watch",
            "--watch-interval",
            "250ms",
        ]);

        assert!(cli.watch);
        assert_eq!(cli.watch_interval, Duration::from_millis(250));
    }

    #[test]
    fn watch_interval_defaults_to_one_second() {
        let cli = Cli::parse_from_iter(["paramtree"]);
        assert_eq!(cli.watch_interval, Duration::from_secs(1));
        assert_eq!(cli.schema, None);
    }

    #[test]
    fn invalid_watch_interval_is_rejected() {
        let result =
            <Cli as clap::Parser>::try_parse_from(["paramtree", "--watch-interval", "soon"]);
        assert!(result.is_err());
    }
}

mod init_command {
    use super::*;

    #[test]
    fn init_uses_default_output() {
        let cli = Cli::parse_from_iter(["paramtree", "init"]);

        assert!(cli.is_init());
        match cli.command {
            Some(Command::Init { output }) => {
                assert_eq!(output, PathBuf::from(DEFAULT_SCHEMA_FILE));
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[test]
    fn init_with_custom_output() {
        let cli = Cli::parse_from_iter(["paramtree", "init", "--output", "custom.toml"]);

        match cli.command {
            Some(Command::Init { output }) => assert_eq!(output, PathBuf::from("custom.toml")),
            other => panic!("expected init, got {other:?}"),
        }
    }
}
