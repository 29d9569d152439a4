/*! Shell command lines for `hdiutil` and `diskutil`

A [`CommandLine`] is a program, a verb, positional arguments and keyword options. It renders to a
single string suitable for `sh -c`. Options are rendered as `-<key> <value>`, or as a bare `-<key>`
flag when the value is absent or empty.

Nothing is quoted or escaped. A volume name or path containing whitespace or shell metacharacters
is interpreted by the shell, so callers must not pass untrusted input.
*/
use std::fmt::Display;

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    verb: String,
    args: Vec<String>,
    options: IndexMap<String, Option<String>>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, verb: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            verb: verb.into(),
            args: Vec::new(),
            options: IndexMap::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Set `-<key> <value>`, replacing any earlier value for `key` in place
    pub fn option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), Some(value.into()));
        self
    }

    /// Set a bare `-<key>` flag
    pub fn flag(&mut self, key: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), None);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &IndexMap<String, Option<String>> {
        &self.options
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(2 + self.args.len() + self.options.len() * 2);
        let keys: Vec<String> = self.options.keys().map(|key| format!("-{key}")).collect();

        parts.extend(
            [self.program.as_str(), self.verb.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty()),
        );
        parts.extend(self.args.iter().map(String::as_str));
        for (dashed, value) in keys.iter().zip(self.options.values()) {
            parts.push(dashed);
            match value {
                Some(value) if !value.is_empty() => parts.push(value),
                _ => (),
            }
        }

        write!(f, "{}", parts.join(" "))
    }
}
