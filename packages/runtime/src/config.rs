use crate::error::{RuntimeError, RuntimeResult};
use serde::Deserialize;

/// Directive and marker attributes, named without their prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    If,
    Else,
    Show,
    Each,
    Transition,
    Key,
    State,
    Use,
    Props,
}

impl Directive {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "if" => Directive::If,
            "else" => Directive::Else,
            "show" => Directive::Show,
            "each" => Directive::Each,
            "transition" => Directive::Transition,
            "key" => Directive::Key,
            "state" => Directive::State,
            "use" => Directive::Use,
            "props" => Directive::Props,
            _ => return None,
        })
    }

    /// Directives the render pass evaluates
    pub fn is_rendered(self) -> bool {
        matches!(self, Directive::If | Directive::Show | Directive::Each)
    }
}

/// Runtime configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use sprout_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "default_transition_ms": 150 }"#).unwrap();
/// assert_eq!(config.default_transition_ms, 150);
/// assert_eq!(config.prefixes, vec!["@".to_string(), "s-".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Attribute prefixes that mark directives (`@if`, `s-if`)
    pub prefixes: Vec<String>,
    /// Marker persisted on two-way bound elements
    pub model_attribute: String,
    /// Fade duration when a transition value omits one
    pub default_transition_ms: u64,
    /// Bound on render passes per flush before giving up
    pub max_flush_passes: usize,
    /// Comment text for conditional anchors
    pub conditional_placeholder: String,
    /// Comment text for list anchors
    pub list_placeholder: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["@".to_string(), "s-".to_string()],
            model_attribute: "s-model".to_string(),
            default_transition_ms: 300,
            max_flush_passes: 100,
            conditional_placeholder: "s-if".to_string(),
            list_placeholder: "s-each".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        serde_json::from_str(json).map_err(RuntimeError::Config)
    }

    /// Classify an attribute name as a directive. A bare `key` counts as the
    /// list key marker.
    pub fn directive(&self, attribute: &str) -> Option<Directive> {
        if attribute == "key" {
            return Some(Directive::Key);
        }
        self.prefixes
            .iter()
            .find_map(|prefix| attribute.strip_prefix(prefix.as_str()))
            .and_then(Directive::from_suffix)
    }

    /// All spellings of `directive`
    pub fn directive_names(&self, directive: Directive) -> Vec<String> {
        let suffix = match directive {
            Directive::If => "if",
            Directive::Else => "else",
            Directive::Show => "show",
            Directive::Each => "each",
            Directive::Transition => "transition",
            Directive::Key => "key",
            Directive::State => "state",
            Directive::Use => "use",
            Directive::Props => "props",
        };
        let mut names: Vec<String> = self
            .prefixes
            .iter()
            .map(|prefix| format!("{prefix}{suffix}"))
            .collect();
        if directive == Directive::Key {
            names.push("key".to_string());
        }
        names
    }
}
