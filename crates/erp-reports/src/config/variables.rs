use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};

/// Renders destination filenames from `$name` templates.
///
/// Built-in variables are taken from the target's period date:
/// `$y` (four-digit year), `$m` (two-digit month), `$d` (two-digit day),
/// plus `$author`. A variable name is the run of ASCII letters after `$`,
/// so `$y_$m` reads as `$y`, `_`, `$m`.
pub struct TemplateEngine {
    author: String,
    variable: Regex,
}

const BUILTIN_VARIABLES: &[&str] = &["y", "m", "d", "author"];

impl TemplateEngine {
    pub fn new(author: &str) -> Self {
        Self {
            author: author.to_string(),
            variable: Regex::new(r"\$([A-Za-z]+)").expect("static variable pattern is valid"),
        }
    }

    /// Checks that a template only uses known variables and names a single file.
    pub fn validate(&self, template: &str) -> Result<(), String> {
        if template.trim().is_empty() {
            return Err("template is empty".to_string());
        }
        if template.contains('/') || template.contains('\\') {
            return Err("template must not contain path separators".to_string());
        }
        for caps in self.variable.captures_iter(template) {
            let name = &caps[1];
            if !BUILTIN_VARIABLES.contains(&name) {
                return Err(format!(
                    "unknown variable '${}' (known: {})",
                    name,
                    BUILTIN_VARIABLES
                        .iter()
                        .map(|v| format!("${}", v))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }
        Ok(())
    }

    pub fn render(&self, template: &str, period: NaiveDate) -> String {
        let vars = self.builtin_variables(period);
        self.variable
            .replace_all(template, |caps: &Captures| {
                vars.get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn builtin_variables(&self, period: NaiveDate) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("y", format!("{:04}", period.year()));
        vars.insert("m", format!("{:02}", period.month()));
        vars.insert("d", format!("{:02}", period.day()));
        vars.insert("author", self.author.clone());
        vars
    }
}
