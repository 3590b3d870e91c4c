use pretty_assertions::assert_eq;

use nova_delegate::{json_schema, ConfigError, DelegationConfig, DelegationPolicy, NamingChoices};

#[test]
fn toml_overrides_the_defaults() {
    let config = DelegationConfig::from_toml(
        r#"
field_name = "inner{Base}"
accessor_prefix = "fetch"
wrapper_prefix = "Adapted"
policy = "auto-forward"
"#,
    )
    .expect("valid config");
    assert_eq!(config.policy, DelegationPolicy::AutoForward);

    let naming = config.naming_for("Animal").expect("valid naming");
    assert_eq!(
        naming,
        NamingChoices::new("innerAnimal", "AdaptedAnimal").with_accessor("fetchInnerAnimal")
    );
}

#[test]
fn empty_toml_is_the_default_config() {
    let config = DelegationConfig::from_toml("").expect("valid config");
    assert_eq!(config, DelegationConfig::default());
    assert!(config.surface().is_strict());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = DelegationConfig::from_toml("field = \"x\"").expect_err("unknown key");
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn field_templates_must_mention_the_base() {
    let err = DelegationConfig::from_toml("field_name = \"delegate\"").expect_err("bad template");
    assert!(
        matches!(&err, ConfigError::InvalidTemplate(template) if template == "delegate"),
        "{err:?}"
    );
}

#[test]
fn generated_names_must_be_identifiers() {
    let config = DelegationConfig {
        wrapper_prefix: "My-".to_string(),
        ..DelegationConfig::default()
    };
    let err = config.naming_for("Animal").expect_err("invalid wrapper");
    assert!(
        matches!(&err, ConfigError::InvalidIdentifier { role, name } if *role == "wrapper class" && name == "My-Animal"),
        "{err:?}"
    );

    let err = NamingChoices::new("class", "MyAnimal")
        .validate()
        .expect_err("keyword field");
    assert!(matches!(err, ConfigError::InvalidIdentifier { .. }), "{err:?}");
}

#[test]
fn json_schema_describes_the_config_file() {
    let schema = serde_json::to_value(json_schema()).expect("schema serializes");
    assert_eq!(schema["title"], "DelegationConfig");
    assert_eq!(schema["additionalProperties"], false);
    let properties = schema["properties"]
        .as_object()
        .expect("schema has properties");
    for key in [
        "field_name",
        "accessor_prefix",
        "wrapper_prefix",
        "policy",
        "generate_accessor",
    ] {
        assert!(properties.contains_key(key), "missing `{key}` in schema");
    }
}
