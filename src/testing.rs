//! In-memory transport for exercising sessions, the pipeline and the
//! inspector without a host.

use crate::utils::{CommandOutput, RemoteTransport};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct Recorder {
    commands: Vec<String>,
    uploads: Vec<(String, Vec<u8>)>,
    closes: usize,
    responses: Vec<(String, CommandOutput)>,
    broken: Vec<String>,
}

/// Records every call; clones share the same record.
///
/// Commands answer with the most recently registered response whose
/// pattern they contain, or an empty success.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<Recorder>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, output: CommandOutput) {
        self.state
            .borrow_mut()
            .responses
            .push((pattern.to_string(), output));
    }

    /// Make commands containing `pattern` fail at the transport level
    pub fn break_on(&self, pattern: &str) {
        self.state.borrow_mut().broken.push(pattern.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Index of the first recorded command containing `pattern`
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.state
            .borrow()
            .commands
            .iter()
            .position(|c| c.contains(pattern))
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.position(pattern).is_some()
    }

    pub fn upload_paths(&self) -> Vec<String> {
        self.state
            .borrow()
            .uploads
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Last content uploaded to `path`, as text
    pub fn upload_text(&self, path: &str) -> Option<String> {
        self.state
            .borrow()
            .uploads
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, content)| String::from_utf8_lossy(content).to_string())
    }

    pub fn closes(&self) -> usize {
        self.state.borrow().closes
    }
}

impl RemoteTransport for FakeTransport {
    fn exec(&mut self, command: &str) -> anyhow::Result<CommandOutput> {
        let mut state = self.state.borrow_mut();
        state.commands.push(command.to_string());
        if state.broken.iter().any(|p| command.contains(p.as_str())) {
            anyhow::bail!("channel closed while running: {}", command);
        }
        let output = state
            .responses
            .iter()
            .rev()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(output)
    }

    fn upload(&mut self, content: &[u8], remote_path: &str) -> anyhow::Result<()> {
        self.state
            .borrow_mut()
            .uploads
            .push((remote_path.to_string(), content.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.state.borrow_mut().closes += 1;
        Ok(())
    }
}
