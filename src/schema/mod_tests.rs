//! Tests for schema-derived parameters.

use super::*;
use crate::config::{ConfigNode, ParamErrorKind};
use crate::env::MapEnv;
use crate::test_fixtures::root_builder;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn field(name: &str, kind: FieldKind) -> FieldSchema {
    FieldSchema::new(name, kind)
}

fn root_with(fields: &[FieldSchema], store: &ValueStore, env: MapEnv) -> ConfigNode {
    root_builder(env)
        .with_params(params_from_schema(fields, "", store).unwrap())
        .build()
        .unwrap()
}

mod tags {
    use super::*;

    #[test]
    fn defaults_without_tags() {
        let store = ValueStore::new();
        let param = param_from_field(&field("Name", FieldKind::String), "", &store)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(param.name(), "Name");
        assert_eq!(param.flag_name(), Some("Name"));
        assert_eq!(param.env_var_name(), Some("Name"));
        assert!(!param.is_mandatory());
    }

    #[test]
    fn every_tag_is_applied() {
        let store = ValueStore::new();
        let schema = field("City", FieldKind::String).with_tags([
            (tag::FLAG, "town"),
            (tag::ENV_VAR, "TOWN"),
            (tag::MANDATORY, "true"),
            (tag::DESC, "City where user lives"),
            (tag::DEFAULT, "Vancouver"),
            (tag::EXAMPLES, "Toronto;Vancouver"),
            (tag::EXCLUSIVE_TAGS, "Street;Zip"),
            (tag::ENUM_VALUES, "Toronto;Vancouver;Montreal"),
        ]);
        let param = param_from_field(&schema, "", &store)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(param.flag_name(), Some("town"));
        assert_eq!(param.env_var_name(), Some("TOWN"));
        assert!(param.is_mandatory());
        assert_eq!(param.description(), Some("City where user lives"));
        assert_eq!(param.default_value(), "Vancouver");
        assert_eq!(param.examples(), ["Toronto", "Vancouver"]);
        assert_eq!(param.exclusive(), ["Street", "Zip"]);
        assert_eq!(param.enum_values(), ["Toronto", "Vancouver", "Montreal"]);
    }

    #[test]
    fn dash_disables_sources() {
        let store = ValueStore::new();
        let schema = field("Secret", FieldKind::String)
            .with_tag(tag::FLAG, DISABLED)
            .with_tag(tag::ENV_VAR, DISABLED);
        let param = param_from_field(&schema, "", &store)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(param.flag_name(), None);
        assert_eq!(param.env_var_name(), None);
    }

    #[test]
    fn empty_name_tags_keep_defaults() {
        let store = ValueStore::new();
        let schema = field("Name", FieldKind::String)
            .with_tag(tag::FLAG, "")
            .with_tag(tag::ENV_VAR, "");
        let param = param_from_field(&schema, "", &store)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(param.flag_name(), Some("Name"));
        assert_eq!(param.env_var_name(), Some("Name"));
    }

    #[test]
    fn prefix_applies_to_names() {
        let store = ValueStore::new();
        let schema = field("Port", FieldKind::Uint)
            .with_tag(tag::ENV_VAR, "PORT")
            .with_tag(tag::EXCLUSIVE_TAGS, "Socket");
        let param = param_from_field(&schema, "Db", &store)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(param.name(), "DbPort");
        assert_eq!(param.flag_name(), Some("DbPort"));
        assert_eq!(param.env_var_name(), Some("DbPORT"));
        assert_eq!(param.exclusive(), ["DbSocket"]);
    }

    #[test]
    fn rejects_non_boolean_mandatory() {
        let store = ValueStore::new();
        let schema = field("Name", FieldKind::String).with_tag(tag::MANDATORY, "yes");
        let err = param_from_field(&schema, "", &store).unwrap_err();

        assert!(matches!(
            err.as_param().unwrap().kind,
            ParamErrorKind::Definition(_)
        ));
        assert!(err.to_string().contains("must be a boolean"));
    }

    #[test]
    fn rejects_unknown_tag() {
        let store = ValueStore::new();
        let schema = field("Name", FieldKind::String).with_tag("json", "name");
        let err = param_from_field(&schema, "", &store).unwrap_err();
        assert!(err.to_string().contains(r#"unknown tag "json""#));
    }
}

mod values {
    use super::*;

    #[tokio::test]
    async fn typed_values_are_stored_under_field_name() {
        let store = ValueStore::new();
        let fields = [
            field("Name", FieldKind::String).with_tag(tag::DEFAULT, "Vincent"),
            field("Age", FieldKind::Uint),
            field("Verbose", FieldKind::Bool),
            field("Timeout", FieldKind::Duration).with_tag(tag::DEFAULT, "1m30s"),
        ];
        let root = root_with(&fields, &store, MapEnv::new().with("Age", "35"));

        root.init(&["-Verbose=true"], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            store.get("Name"),
            Some(FieldValue::String("Vincent".to_string()))
        );
        assert_eq!(store.get("Age"), Some(FieldValue::Uint(35)));
        assert_eq!(store.get("Verbose"), Some(FieldValue::Bool(true)));
        assert_eq!(
            store.get("Timeout"),
            Some(FieldValue::Duration(Duration::from_secs(90)))
        );
    }

    #[tokio::test]
    async fn empty_value_is_not_stored() {
        let store = ValueStore::new();
        let root = root_with(&[field("Age", FieldKind::Int)], &store, MapEnv::new());

        root.init(&["-Age="], &CancellationToken::new())
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_value_is_a_parse_error() {
        let store = ValueStore::new();
        let root = root_with(&[field("Age", FieldKind::Int)], &store, MapEnv::new());

        let err = root
            .init(&["-Age=old"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_param().unwrap().kind,
            ParamErrorKind::Parse(_)
        ));
        assert!(err.to_string().contains(r#"invalid int "old""#));
    }

    #[tokio::test]
    async fn prefixed_param_stores_plain_key() {
        let store = ValueStore::new();
        let params =
            params_from_schema(&[field("Port", FieldKind::Uint)], "Db", &store).unwrap();
        let root = root_builder(MapEnv::new())
            .with_params(params)
            .build()
            .unwrap();

        root.init(&["-DbPort=5432"], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.get("Port"), Some(FieldValue::Uint(5432)));
    }

    struct Upper(Arc<Mutex<String>>);

    impl SetFromStr for Upper {
        fn set(&self, value: &str) -> Result<(), crate::config::ParseError> {
            if value.chars().any(char::is_numeric) {
                return Err("digits not allowed".into());
            }
            *self.0.lock().unwrap() = value.to_uppercase();
            Ok(())
        }
    }

    #[tokio::test]
    async fn custom_setter_is_used() {
        let store = ValueStore::new();
        let target = Arc::new(Mutex::new(String::new()));
        let schema =
            field("Code", FieldKind::String).with_setter(Upper(Arc::clone(&target)));
        let root = root_with(&[schema], &store, MapEnv::new());

        root.init(&["-Code=abc"], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*target.lock().unwrap(), "ABC");
        assert_eq!(store.get("Code"), Some(FieldValue::String("abc".to_string())));

        let err = root
            .init(&["-Code=a1"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("digits not allowed"));
    }
}
