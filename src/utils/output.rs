use colored::Colorize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// How a line should be styled on a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Bold,
    Success,
    Warning,
    Error,
}

enum Input {
    Stdin,
    Scripted(VecDeque<String>),
}

enum Output {
    Stdout,
    Captured(Vec<String>),
}

struct Inner {
    input: Input,
    output: Output,
}

/// The operator's terminal: styled status lines out, prompt answers in.
///
/// Cloning shares the same terminal, so the resolver, the session and the
/// pipeline can all write to it during a run.
#[derive(Clone)]
pub struct Console {
    inner: Rc<RefCell<Inner>>,
}

impl Console {
    pub fn stdio() -> Self {
        Self::from_parts(Input::Stdin, Output::Stdout)
    }

    /// Console that answers prompts from `answers` and records every line
    pub fn scripted<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let answers = answers.into_iter().map(Into::into).collect();
        Self::from_parts(Input::Scripted(answers), Output::Captured(Vec::new()))
    }

    pub fn captured() -> Self {
        Self::scripted(Vec::<String>::new())
    }

    fn from_parts(input: Input, output: Output) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner { input, output })),
        }
    }

    /// Lines written so far (captured consoles only)
    pub fn lines(&self) -> Vec<String> {
        match &self.inner.borrow().output {
            Output::Captured(lines) => lines.clone(),
            Output::Stdout => Vec::new(),
        }
    }

    pub fn styled(&self, style: Style, text: impl AsRef<str>) {
        let text = text.as_ref();
        let mut inner = self.inner.borrow_mut();
        match &mut inner.output {
            Output::Captured(lines) => lines.extend(text.split('\n').map(str::to_string)),
            Output::Stdout => {
                let painted = match style {
                    Style::Plain => text.normal(),
                    Style::Bold => text.bold(),
                    Style::Success => text.green(),
                    Style::Warning => text.yellow(),
                    Style::Error => text.red(),
                };
                println!("{}", painted);
            }
        }
    }

    pub fn line(&self, text: impl AsRef<str>) {
        self.styled(Style::Plain, text);
    }

    pub fn blank(&self) {
        self.line("");
    }

    /// Bold title printed at the top of a command
    pub fn header(&self, text: impl AsRef<str>) {
        self.styled(Style::Bold, text);
    }

    /// Blank line followed by a section title
    pub fn section(&self, text: impl AsRef<str>) {
        self.blank();
        self.line(text);
    }

    pub fn success(&self, text: impl AsRef<str>) {
        self.styled(Style::Success, format!("  ✓ {}", text.as_ref()));
    }

    pub fn warning(&self, text: impl AsRef<str>) {
        self.styled(Style::Warning, format!("  ⚠ {}", text.as_ref()));
    }

    pub fn error(&self, text: impl AsRef<str>) {
        self.styled(Style::Error, format!("  ✗ {}", text.as_ref()));
    }

    pub fn info(&self, text: impl AsRef<str>) {
        self.line(format!("  ℹ {}", text.as_ref()));
    }

    /// Print `prompt` and read one trimmed line. `None` means input is exhausted.
    pub fn ask(&self, prompt: &str) -> io::Result<Option<String>> {
        let mut inner = self.inner.borrow_mut();
        let answer = match &mut inner.input {
            Input::Scripted(answers) => answers.pop_front(),
            Input::Stdin => {
                print!("{}", prompt);
                io::stdout().flush()?;

                let mut input = String::new();
                let read = io::stdin().lock().read_line(&mut input)?;
                if read == 0 { None } else { Some(input) }
            }
        };

        let answer = answer.map(|a| a.trim().to_string());
        if let Output::Captured(lines) = &mut inner.output {
            lines.push(format!("{}{}", prompt, answer.as_deref().unwrap_or("")));
        }
        Ok(answer)
    }
}
