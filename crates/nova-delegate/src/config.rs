//! User choices that drive a conversion: the delegation surface, naming, and
//! the `delegate.toml` defaults they are derived from.

use std::sync::OnceLock;

use nova_hir::SymbolId;
use nova_syntax::Visibility;
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse toml config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("`{name}` is not a valid Java identifier for the {role}")]
    InvalidIdentifier { role: &'static str, name: String },
    #[error("field name template `{0}` must mention `{{base}}` or `{{Base}}`")]
    InvalidTemplate(String),
}

/// What happens to base members that the surface does not forward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum DelegationPolicy {
    /// Every use of a non-forwarded member is reported and must be accepted.
    #[default]
    Strict,
    /// Non-forwarded members stay reachable through a public accessor.
    AutoForward,
}

/// One base method to expose on the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForwardedMember {
    pub member: SymbolId,
    /// Narrower visibility for the forwarder; the original one when `None`.
    pub visibility: Option<Visibility>,
}

/// Which parts of the base type the host keeps exposing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DelegationSurface {
    pub methods: Vec<ForwardedMember>,
    /// Interfaces implemented by the base that the host keeps implementing.
    pub interfaces: Vec<SymbolId>,
    pub policy: DelegationPolicy,
}

impl DelegationSurface {
    pub fn new(policy: DelegationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn forward(self, member: SymbolId) -> Self {
        self.forward_with_visibility(member, None)
    }

    #[must_use]
    pub fn forward_with_visibility(
        mut self,
        member: SymbolId,
        visibility: impl Into<Option<Visibility>>,
    ) -> Self {
        self.methods.push(ForwardedMember {
            member,
            visibility: visibility.into(),
        });
        self
    }

    #[must_use]
    pub fn keep_interface(mut self, interface: SymbolId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn is_forwarded(&self, member: SymbolId) -> bool {
        self.methods.iter().any(|forwarded| forwarded.member == member)
    }

    pub fn is_strict(&self) -> bool {
        self.policy == DelegationPolicy::Strict
    }
}

/// Names of everything the conversion generates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamingChoices {
    /// The delegate field.
    pub field: String,
    /// Public getter for the delegate, if one is generated.
    pub accessor: Option<String>,
    /// Private inner class used when the base cannot be instantiated as is.
    pub wrapper: String,
}

impl NamingChoices {
    pub fn new(field: impl Into<String>, wrapper: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            accessor: None,
            wrapper: wrapper.into(),
        }
    }

    #[must_use]
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("delegate field", &self.field)?;
        if let Some(accessor) = &self.accessor {
            check_identifier("accessor", accessor)?;
        }
        check_identifier("wrapper class", &self.wrapper)
    }
}

/// Defaults read from `delegate.toml`.
///
/// ```toml
/// field_name = "{base}"
/// accessor_prefix = "get"
/// wrapper_prefix = "My"
/// policy = "strict"
/// generate_accessor = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct DelegationConfig {
    /// Template for the delegate field; `{base}` is the base name in lower camel case,
    /// `{Base}` the name as declared.
    #[serde(default = "DelegationConfig::default_field_name")]
    pub field_name: String,
    #[serde(default = "DelegationConfig::default_accessor_prefix")]
    pub accessor_prefix: String,
    #[serde(default = "DelegationConfig::default_wrapper_prefix")]
    pub wrapper_prefix: String,
    #[serde(default)]
    pub policy: DelegationPolicy,
    /// Generate a public accessor even under the strict policy.
    #[serde(default)]
    pub generate_accessor: bool,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            field_name: Self::default_field_name(),
            accessor_prefix: Self::default_accessor_prefix(),
            wrapper_prefix: Self::default_wrapper_prefix(),
            policy: DelegationPolicy::default(),
            generate_accessor: false,
        }
    }
}

impl DelegationConfig {
    fn default_field_name() -> String {
        "{base}".to_string()
    }

    fn default_accessor_prefix() -> String {
        "get".to_string()
    }

    fn default_wrapper_prefix() -> String {
        "My".to_string()
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: DelegationConfig = toml::from_str(text)?;
        if !config.field_name.contains("{base}") && !config.field_name.contains("{Base}") {
            return Err(ConfigError::InvalidTemplate(config.field_name));
        }
        Ok(config)
    }

    /// Derives the generated names for converting away from `base`.
    pub fn naming_for(&self, base: &str) -> Result<NamingChoices, ConfigError> {
        let field = self
            .field_name
            .replace("{base}", &lower_camel(base))
            .replace("{Base}", base);
        let accessor = (self.generate_accessor || self.policy == DelegationPolicy::AutoForward)
            .then(|| format!("{}{}", self.accessor_prefix, upper_camel(&field)));
        let naming = NamingChoices {
            field,
            accessor,
            wrapper: format!("{}{}", self.wrapper_prefix, base),
        };
        naming.validate()?;
        Ok(naming)
    }

    /// A surface with this config's policy and nothing forwarded yet.
    pub fn surface(&self) -> DelegationSurface {
        DelegationSurface::new(self.policy)
    }
}

/// JSON schema for `delegate.toml`.
pub fn json_schema() -> RootSchema {
    schema_for!(DelegationConfig)
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn upper_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

pub(crate) fn is_identifier(name: &str) -> bool {
    static IDENT_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = IDENT_RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier regex should compile")
    });
    re.is_match(name) && !KEYWORDS.contains(&name)
}

fn check_identifier(role: &'static str, name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            role,
            name: name.to_string(),
        })
    }
}
