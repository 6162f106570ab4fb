//! Placeholder substitution over HTML template strings.
//!
//! Templates contain `{{name}}` tokens (optional whitespace inside the
//! braces, names limited to letters, digits and underscore). Every token is
//! replaced on render; a token with no matching variable becomes the empty
//! string, so raw placeholder syntax never leaks into shipped HTML.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::{fs, path::Path, sync::OnceLock};

/// Variable mapping handed to [`render`].
pub type Vars<'a> = FxHashMap<&'a str, String>;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap()
    })
}

/// Substitute every placeholder token in `template` from `vars`.
///
/// Missing keys become the empty string. Brace pairs whose inner text is not
/// a plain identifier are not placeholders and pass through untouched.
pub fn render(template: &str, vars: &Vars) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// The two page templates a site project supplies.
pub struct Templates {
    pub layout: String,
    pub redirect: String,
}

/// Read both templates from the templates directory, once per build.
pub fn load_templates(templates_dir: &Path) -> Result<Templates> {
    let read = |name: &str| -> Result<String> {
        let path = templates_dir.join(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read template {}", path.display()))
    };
    Ok(Templates {
        layout: read("layout.html")?,
        redirect: read("redirect.html")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> Vars<'static> {
        pairs
            .iter()
            .map(|(k, v)| (*k, (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_substitutes_known_token() {
        let out = render("<title>{{title}}</title>", &vars(&[("title", "Install")]));
        assert_eq!(out, "<title>Install</title>");
    }

    #[test]
    fn test_whitespace_inside_delimiters() {
        let out = render("{{  title  }}", &vars(&[("title", "Install")]));
        assert_eq!(out, "Install");
    }

    #[test]
    fn test_missing_token_becomes_empty() {
        let out = render("a{{missing}}b", &vars(&[]));
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_render_is_idempotent_on_substituted_output() {
        let vars = vars(&[("title", "Install")]);
        let once = render("<h1>{{title}}</h1>", &vars);
        let twice = render(&once, &vars);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_plain_text_unchanged() {
        let input = "<p>nothing to see { here }</p>";
        assert_eq!(render(input, &vars(&[])), input);
    }

    #[test]
    fn test_non_identifier_token_left_untouched() {
        let input = "{{foo.bar}} {{a-b}} {{x y}}";
        assert_eq!(render(input, &vars(&[("foo", "X")])), input);
    }

    #[test]
    fn test_repeated_token_replaced_everywhere() {
        let out = render("{{x}}-{{x}}", &vars(&[("x", "1")]));
        assert_eq!(out, "1-1");
    }

    #[test]
    fn test_value_with_dollar_sign_is_literal() {
        let out = render("{{cmd}}", &vars(&[("cmd", "echo $HOME")]));
        assert_eq!(out, "echo $HOME");
    }
}
