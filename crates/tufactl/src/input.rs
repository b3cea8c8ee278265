/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Operator input.
//!
//! Commands never read the terminal directly. They ask an [`InputSource`],
//! which is [`TerminalInput`] in the binary and [`ScriptedInput`] in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};

pub trait InputSource {
    /// Shows `message` and returns one line of input without its newline.
    fn prompt(&mut self, message: &str) -> io::Result<String>;

    /// Like [`prompt`](Self::prompt), for secrets.
    fn prompt_password(&mut self, message: &str) -> io::Result<String> {
        self.prompt(message)
    }
}

/// Reads from stdin, prompting on stderr.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{message}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Replays canned answers in order.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Every prompt shown so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl InputSource for ScriptedInput {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for '{message}'"),
            )
        })
    }
}

/// Prompts until a non-empty answer is given, or returns `default` for an
/// empty answer when one is provided.
pub fn prompt_string(
    input: &mut dyn InputSource,
    message: &str,
    default: Option<&str>,
) -> Result<String> {
    let shown = match default {
        Some(default) => format!("{message} [{default}]"),
        None => message.to_string(),
    };
    let answer = input.prompt(&shown).context("failed to read input")?;
    let answer = answer.trim();
    match (answer.is_empty(), default) {
        (false, _) => Ok(answer.to_string()),
        (true, Some(default)) => Ok(default.to_string()),
        (true, None) => bail!("{message}: a value is required"),
    }
}

pub fn prompt_u32(input: &mut dyn InputSource, message: &str, default: u32) -> Result<u32> {
    let answer = prompt_string(input, message, Some(&default.to_string()))?;
    answer
        .parse()
        .with_context(|| format!("'{answer}' is not a valid number"))
}

/// A comma-separated list; blank entries are dropped.
pub fn prompt_list(input: &mut dyn InputSource, message: &str) -> Result<Vec<String>> {
    Ok(split_list(&prompt_string(input, message, None)?))
}

pub fn split_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Asks for a new password twice.
pub fn prompt_new_password(input: &mut dyn InputSource, message: &str) -> Result<String> {
    let password = input
        .prompt_password(message)
        .context("failed to read password")?;
    let confirm = input
        .prompt_password("Confirm password")
        .context("failed to read password")?;
    if password != confirm {
        bail!("passwords do not match");
    }
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_replays_in_order() {
        let mut input = ScriptedInput::new(["a", "b"]);
        assert_eq!(input.prompt("first").unwrap(), "a");
        assert_eq!(input.prompt_password("second").unwrap(), "b");
        assert!(input.prompt("third").is_err());
        assert_eq!(input.prompts(), ["first", "second", "third"]);
    }

    #[test]
    fn test_prompt_defaults() {
        let mut input = ScriptedInput::new(["", "7", "x"]);
        assert_eq!(prompt_u32(&mut input, "Threshold", 1).unwrap(), 1);
        assert_eq!(prompt_u32(&mut input, "Threshold", 1).unwrap(), 7);
        assert!(prompt_u32(&mut input, "Threshold", 1).is_err());
    }

    #[test]
    fn test_prompt_list() {
        let mut input = ScriptedInput::new([" a, b ,,c "]);
        assert_eq!(prompt_list(&mut input, "Key ids").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_new_password_must_match() {
        let mut input = ScriptedInput::new(["one", "two"]);
        assert!(prompt_new_password(&mut input, "Password").is_err());

        let mut input = ScriptedInput::new(["same", "same"]);
        assert_eq!(prompt_new_password(&mut input, "Password").unwrap(), "same");
    }
}
