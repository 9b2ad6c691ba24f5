//! Line based terminal prompts
//!
//! A [`Prompter`] reads answers from any `BufRead` and writes prompts to any
//! `Write`, so the interactive composers run the same against a terminal and
//! against canned input in tests.
//!
//! ```text
//! Operation (add|del|show|send|quit) [add]: show
//! TTL (in seconds) [60]: 3600
//! ```

use std::io::{self, BufRead, Write};

/// Prompt reader over an input and an output stream
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Output stream, for printing between prompts
    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// Consume the prompter, returning the output stream
    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Ask a free text question; an empty answer yields `default`
    pub fn question(&mut self, prompt: &str, default: &str) -> io::Result<String> {
        if default.is_empty() {
            write!(self.output, "{prompt}: ")?;
        } else {
            write!(self.output, "{prompt} [{default}]: ")?;
        }
        self.output.flush()?;

        let answer = self.read_line()?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Ask until the answer parses as an integer
    pub fn int_question(&mut self, prompt: &str, default: i64) -> io::Result<i64> {
        loop {
            let answer = self.question(prompt, &default.to_string())?;
            match answer.parse::<i64>() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "Error: '{answer}' is not an integer")?,
            }
        }
    }

    /// Ask until the answer matches one of `choices`, ignoring case
    ///
    /// Returns the matching choice as spelled in `choices`.
    pub fn radio_button(
        &mut self,
        prompt: &str,
        default: &str,
        choices: &[&str],
    ) -> io::Result<String> {
        let label = format!("{prompt} ({})", choices.join("|"));
        loop {
            let answer = self.question(&label, default)?;
            if let Some(choice) = choices.iter().find(|c| c.eq_ignore_ascii_case(&answer)) {
                return Ok((*choice).to_string());
            }
            writeln!(
                self.output,
                "Answer '{answer}' did not match any of the choices: [{}]",
                choices.join(" ")
            )?;
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
        }
        Ok(line.trim().to_string())
    }
}
