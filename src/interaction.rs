use std::io::{stderr, stdin, BufRead, IsTerminal, Write};

use nix::sys::termios::{self, LocalFlags, SetArg};
use owo_colors::OwoColorize;

#[non_exhaustive]
#[derive(thiserror::Error, Debug, strum::IntoStaticStr)]
pub enum PasswordError {
    #[error("Unable to read password from stdin")]
    Read(#[source] std::io::Error),
    #[error("No password was entered")]
    Empty,
    #[error("Passwords did not match")]
    Mismatch,
    #[error("Changing terminal echo")]
    Terminal(#[source] nix::errno::Errno),
}

/// Source of disk image passwords
pub trait PasswordPrompt: Send + Sync + std::fmt::Debug {
    fn read_password(&self, prompt: &str) -> Result<String, PasswordError>;

    /// Ask for a new password twice, failing unless both entries agree
    fn new_password(&self) -> Result<String, PasswordError> {
        let first = self.read_password("Enter a new password:")?;
        let second = self.read_password("Reenter the password:")?;
        if first != second {
            return Err(PasswordError::Mismatch);
        }
        Ok(first)
    }
}

/// Reads from the controlling terminal with echo turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&self, prompt: &str) -> Result<String, PasswordError> {
        let mut out = stderr();
        write!(out, "{} ", prompt.bold()).map_err(PasswordError::Read)?;
        out.flush().map_err(PasswordError::Read)?;

        let input = stdin();
        let password = if input.is_terminal() {
            let original = termios::tcgetattr(&input).map_err(PasswordError::Terminal)?;
            let mut silent = original.clone();
            silent.local_flags.remove(LocalFlags::ECHO);
            termios::tcsetattr(&input, SetArg::TCSANOW, &silent)
                .map_err(PasswordError::Terminal)?;

            let read = read_line();

            termios::tcsetattr(&input, SetArg::TCSANOW, &original)
                .map_err(PasswordError::Terminal)?;
            writeln!(out).map_err(PasswordError::Read)?;
            read?
        } else {
            read_line()?
        };

        if password.is_empty() {
            return Err(PasswordError::Empty);
        }
        Ok(password)
    }
}

fn read_line() -> Result<String, PasswordError> {
    let stdin = stdin();
    let stdin = stdin.lock();
    let mut lines = stdin.lines();
    match lines.next().transpose().map_err(PasswordError::Read)? {
        None => Err(PasswordError::Empty),
        Some(line) => Ok(line),
    }
}

/// NUL-terminate each password, the framing `-stdinpass` expects
pub(crate) fn stdin_passwords<'a>(passwords: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    passwords
        .into_iter()
        .flat_map(|password| password.bytes().chain(std::iter::once(0)))
        .collect()
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// Answers prompts from a fixed list
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedPrompt {
        answers: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub(crate) fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().map(String::from).collect()),
                prompts: Mutex::default(),
            }
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl PasswordPrompt for ScriptedPrompt {
        fn read_password(&self, prompt: &str) -> Result<String, PasswordError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(PasswordError::Empty)
        }
    }
}
