//! Localized text lookup.
//!
//! Views describe what they want to say as a [`Message`] (a catalog key
//! plus named arguments) and turn it into text through a [`Localizer`]
//! passed in by the caller. The crate ships an English [`Catalog`]; any
//! closure `Fn(&str, &[(&str, &str)]) -> String` works as well.

use serde::Serialize;

pub mod catalog;

pub use catalog::{Catalog, CatalogError};

/// Message lookup capability: `t(key, args) -> text`
pub trait Localizer {
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String;
}

impl<F> Localizer for F
where
    F: Fn(&str, &[(&str, &str)]) -> String,
{
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String {
        self(key, args)
    }
}

/// A catalog key with its arguments, not yet localized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub key: &'static str,
    pub args: Vec<(&'static str, String)>,
}

impl Message {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    pub fn localize(&self, localizer: &dyn Localizer) -> String {
        let args: Vec<(&str, &str)> = self
            .args
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        localizer.t(self.key, &args)
    }
}

/// Replace `{name}` placeholders; unknown placeholders are left as written
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match args.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_replaces_known_placeholders() {
        assert_eq!(
            interpolate("go to {url} now", &[("url", "https://a.test")]),
            "go to https://a.test now"
        );
        assert_eq!(interpolate("{a}{b}", &[("a", "1"), ("b", "2")]), "12");
    }

    #[test]
    fn interpolate_keeps_unknown_and_unclosed() {
        assert_eq!(interpolate("hi {who}", &[]), "hi {who}");
        assert_eq!(interpolate("open { brace", &[]), "open { brace");
    }

    #[test]
    fn closures_are_localizers() {
        let upper = |key: &str, _args: &[(&str, &str)]| key.to_uppercase();
        let message = Message::new("steps.then");
        assert_eq!(message.localize(&upper), "STEPS.THEN");
    }

    #[test]
    fn message_args_reach_the_localizer() {
        let echo = |key: &str, args: &[(&str, &str)]| {
            let parts: Vec<String> = args.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{key}[{}]", parts.join(","))
        };
        let message = Message::new("explain.append")
            .arg("array", "rows")
            .arg("value", "row");
        assert_eq!(message.localize(&echo), "explain.append[array=rows,value=row]");
    }
}
