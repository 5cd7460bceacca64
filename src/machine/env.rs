use std::collections::HashMap;
use std::sync::LazyLock;

use log::trace;
use regex::{Captures, Regex};
use serde::Serialize;

/// `{name}` for any identifier, `$NAME` for upper-case ones.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Z_][A-Z0-9_]*)")
        .expect("placeholder pattern is valid")
});

static DOLLAR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("name pattern is valid"));

/// User-defined variables for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Env(HashMap<String, String>);

impl Env {
    /// Retrieve the value stored at `variable_name`, if it was ever set.
    pub fn get_variable(&self, variable_name: &str) -> Option<&str> {
        self.0.get(variable_name).map(String::as_str)
    }

    /// Set `variable_name` to `value`, always overwrites.
    pub fn set_variable(&mut self, variable_name: &str, value: impl Into<String>) {
        self.0.insert(variable_name.to_owned(), value.into());
    }

    /// Is `variable_name` set to something other than the empty string?
    pub fn is_truthy(&self, variable_name: &str) -> bool {
        self.get_variable(variable_name)
            .is_some_and(|value| !value.is_empty())
    }

    /// Can `variable_name` be written as `$NAME` in a template? Names with
    /// lower-case letters only resolve in the `{name}` form.
    pub fn dollar_form_resolves(variable_name: &str) -> bool {
        DOLLAR_NAME.is_match(variable_name)
    }

    /// Substitute every placeholder in `template` with its current value.
    ///
    /// ```
    /// # use winnow_sm::Env;
    /// let mut env = Env::default();
    /// env.set_variable("NAME", "Al Gore");
    /// env.set_variable("color", "Green");
    /// assert_eq!(
    ///     env.resolve_template("Hi there, $NAME, seen anything {color} lately?"),
    ///     "Hi there, Al Gore, seen anything Green lately?"
    /// );
    /// ```
    ///
    /// Placeholders naming an unset variable are left as written:
    ///
    /// ```
    /// # use winnow_sm::Env;
    /// let env = Env::default();
    /// assert_eq!(env.resolve_template("How is $TOPIC?"), "How is $TOPIC?");
    /// ```
    pub fn resolve_template(&self, template: &str) -> String {
        let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            match self.get_variable(name) {
                Some(value) => value.to_owned(),
                None => caps[0].to_owned(),
            }
        });
        trace!("Resolved template {template:?} -> {resolved:?}");
        resolved.into_owned()
    }
}
