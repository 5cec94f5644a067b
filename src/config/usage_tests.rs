//! Tests for usage rendering and error enrichment.

use super::*;
use crate::param::{Param, loader_fn};
use crate::test_fixtures::build;
use std::time::Duration;

fn noop(_: &str) -> Result<(), ParseError> {
    Ok(())
}

fn city() -> Param {
    build(
        Param::builder("City", noop)
            .with_description("City where user lives")
            .with_mandatory(true)
            .with_default("Vancouver")
            .with_examples(["Toronto", "Vancouver"])
            .with_flag_name("Town")
            .with_env_var_name("TOWN")
            .with_enum_values(["Toronto", "Vancouver", "Montreal"])
            .with_sub_command_local(true),
    )
}

fn age() -> Param {
    build(
        Param::builder("Age", noop)
            .with_loader(loader_fn(|_| async { Ok("35".to_string()) }))
            .with_sub_command_local(true),
    )
}

fn tree() -> ConfigNode {
    let city_node = ConfigNode::builder()
        .with_param(city())
        .with_description("A city reader")
        .build()
        .unwrap();
    ConfigNode::builder()
        .with_param(age())
        .with_sub_command("City", city_node)
        .with_description("An age reader with a command for city")
        .build()
        .unwrap()
}

mod param_usage {
    use super::*;

    #[test]
    fn all_options() {
        assert_eq!(
            city().usage(1),
            "\tParam: City
\t\tDescription: City where user lives
\t\tExample: [Toronto Vancouver]
\t\tDefault: Vancouver
\t\tEnumValues: [Toronto Vancouver Montreal]
\t\tMandatory value.
\t\tThis param won't be available in sub commands.
\t\tCommand line flag: -Town
\t\tEnvironment variable name: TOWN
\t\tNo custom loader defined.
"
        );
    }

    #[test]
    fn minimal() {
        let param = build(Param::builder("p1", noop));
        assert_eq!(
            param.usage(0),
            "Param: p1
\tCommand line flag: -p1
\tEnvironment variable name: p1
\tNo custom loader defined.
"
        );
    }

    #[test]
    fn disabled_sources_and_refresh() {
        let param = build(
            Param::builder("Token", noop)
                .without_flag()
                .without_env_var()
                .with_exclusive(["Password"])
                .with_loader(loader_fn(|_| async { Ok(String::new()) }))
                .with_refresh(Duration::from_millis(70)),
        );
        let usage = param.usage(0);

        assert!(usage.contains("\tExclusive with: [Password]\n"));
        assert!(usage.contains("\tCommand line flag disabled.\n"));
        assert!(usage.contains("\tEnvironment variable disabled.\n"));
        assert!(usage.contains("\tUsing a custom loader, refresh every 70ms.\n"));
    }

    #[test]
    fn loader_without_refresh() {
        assert!(
            age()
                .usage(0)
                .contains("Using a custom loader without periodic update.")
        );
    }
}

mod node_usage {
    use super::*;

    #[test]
    fn nested_tree() {
        let expected = "Config/Command description: An age reader with a command for city

\tParam: Age
\t\tThis param won't be available in sub commands.
\t\tCommand line flag: -Age
\t\tEnvironment variable name: Age
\t\tUsing a custom loader without periodic update.

Command: City
\tConfig/Command description: A city reader

\t\tParam: City
\t\t\tDescription: City where user lives
\t\t\tExample: [Toronto Vancouver]
\t\t\tDefault: Vancouver
\t\t\tEnumValues: [Toronto Vancouver Montreal]
\t\t\tMandatory value.
\t\t\tThis param won't be available in sub commands.
\t\t\tCommand line flag: -Town
\t\t\tEnvironment variable name: TOWN
\t\t\tNo custom loader defined.

";
        assert_eq!(tree().usage(0), expected);
    }

    #[test]
    fn declaration_order_is_kept() {
        let node = ConfigNode::builder()
            .with_param(build(Param::builder("Zeta", noop)))
            .with_param(build(Param::builder("Alpha", noop)))
            .with_sub_command("zz", ConfigNode::builder().build().unwrap())
            .with_sub_command("aa", ConfigNode::builder().build().unwrap())
            .build()
            .unwrap();
        let usage = node.usage(0);

        let pos = |needle: &str| usage.find(needle).unwrap();
        assert!(pos("Param: Zeta") < pos("Param: Alpha"));
        assert!(pos("Command: zz") < pos("Command: aa"));
    }

    #[test]
    fn empty_node() {
        assert_eq!(ConfigNode::builder().build().unwrap().usage(0), "");
    }
}

mod with_usage {
    use super::*;

    #[test]
    fn param_error_gets_param_usage() {
        let root = tree();
        let err = root.with_usage(ConfigError::param(
            SubCommandPath::from_sub_commands(["City"]),
            "City",
            ParamErrorKind::MandatoryValue,
        ));

        assert_eq!(err.usage(), Some(city().usage(1).as_str()));
        assert!(err.to_string().starts_with(
            "on sub-commands [\"\", \"City\"], param \"City\": mandatory value\nUsage:\n\tParam: City\n"
        ));
    }

    #[test]
    fn param_on_parent_node_is_found() {
        let root = tree();
        let err = root.with_usage(ConfigError::param(
            SubCommandPath::from_sub_commands(["City"]),
            "Age",
            ParamErrorKind::MandatoryValue,
        ));
        assert!(err.usage().unwrap().starts_with("\tParam: Age\n"));
    }

    #[test]
    fn unknown_param_is_returned_unchanged() {
        let root = tree();
        let err = root.with_usage(ConfigError::param(
            SubCommandPath::root(),
            "Nope",
            ParamErrorKind::MandatoryValue,
        ));
        assert!(matches!(err, ConfigError::Param(_)));
    }

    #[test]
    fn command_error_gets_node_usage() {
        let root = tree();
        let err = root.with_usage(ConfigError::command(
            SubCommandPath::from_sub_commands(["City"]),
            CommandErrorKind::Definition("err desc".to_string()),
        ));

        let usage = err.usage().unwrap();
        assert!(usage.starts_with("Config/Command description: A city reader\n"));
        assert!(!usage.contains("Param: Age"));
    }

    #[test]
    fn command_error_on_missing_node_is_unchanged() {
        let root = tree();
        let err = root.with_usage(ConfigError::command(
            SubCommandPath::from_sub_commands(["Nope"]),
            CommandErrorKind::Definition("err desc".to_string()),
        ));
        assert!(err.usage().is_none());
    }

    #[test]
    fn undefined_command_gets_deepest_node_usage() {
        let root = tree();
        let err = root.with_usage(ConfigError::command(
            SubCommandPath::from_sub_commands(["City", "Street"]),
            CommandErrorKind::UndefinedCommand {
                declared: Vec::new(),
            },
        ));
        assert!(
            err.usage()
                .unwrap()
                .starts_with("Config/Command description: A city reader\n")
        );
    }

    #[test]
    fn aggregated_error_gets_each_param_once() {
        let root = ConfigNode::builder()
            .with_param(build(Param::builder("A", noop)))
            .with_param(build(Param::builder("B", noop)))
            .build()
            .unwrap();
        let aggregated = AggregatedError {
            errors: ["A", "B", "A"]
                .into_iter()
                .map(|name| {
                    ParamError::new(
                        SubCommandPath::root(),
                        name,
                        ParamErrorKind::Exclusive {
                            other: String::new(),
                        },
                    )
                })
                .collect(),
        };

        let err = root.with_usage(aggregated.into());
        let usage = err.usage().unwrap();
        assert_eq!(usage.matches("Param: A").count(), 1);
        assert_eq!(usage.matches("Param: B").count(), 1);
    }

    #[test]
    fn cancelled_and_wrapped_are_unchanged() {
        let root = tree();
        assert!(matches!(
            root.with_usage(ConfigError::Cancelled),
            ConfigError::Cancelled
        ));

        let wrapped = root.with_usage(ConfigError::param(
            SubCommandPath::root(),
            "Age",
            ParamErrorKind::MandatoryValue,
        ));
        let rewrapped = root.with_usage(wrapped);
        match rewrapped {
            ConfigError::WithUsage { error, .. } => {
                assert!(matches!(*error, ConfigError::Param(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
