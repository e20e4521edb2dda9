//! Tree-walking VM: executes a [`Program`] tick by tick, suspending at
//! `Pause`, at end-of-passage with pending text or selections, and on
//! fatal errors.

use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::{BinaryOp, Command, Expression, UnaryOp};
use crate::callbacks::HostCallbacks;
use crate::error::VmError;
use crate::program::Program;
use crate::runtime::callstack::{CallFrame, CallStack};
use crate::runtime::selection::Selection;
use crate::value::{call_builtin, Rng, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMState {
    Running,
    ScreenPause,
    WaitingForSelection,
    Stopped,
}

/// VM construction parameters. Not file-based configuration: a host builds
/// this programmatically, the same way the teacher's runtime graph takes
/// plain constructor arguments.
#[derive(Debug, Clone, Copy)]
pub struct VmConfig {
    pub line_max_len: usize,
    pub call_stack_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            line_max_len: 38,
            call_stack_depth: 10,
        }
    }
}

const PAGE_SIZE: usize = 6;
const PAGE_STRIDE: usize = 5;

pub struct Vm {
    program: Program,
    config: VmConfig,
    state: VMState,
    passage: String,
    ip: usize,
    variables: HashMap<String, Value>,
    call_stack: CallStack,
    text_buffer: String,
    pending_lines: Vec<String>,
    selections: Vec<Selection>,
    rng: Rng,
}

impl Vm {
    pub fn new(program: Program, config: VmConfig, seed: u64) -> Self {
        Vm {
            program,
            config,
            state: VMState::Running,
            passage: "Start".to_string(),
            ip: 0,
            variables: HashMap::new(),
            call_stack: CallStack::new(config.call_stack_depth),
            text_buffer: String::new(),
            pending_lines: Vec::new(),
            selections: Vec::new(),
            rng: Rng::new(seed),
        }
    }

    pub fn state(&self) -> VMState {
        self.state
    }

    /// Advance execution until the next suspension point: `ScreenPause`,
    /// `WaitingForSelection`, `Stopped`, or a fatal error (which also
    /// transitions to `Stopped`, after invoking `fatal_error`).
    pub fn run(&mut self, host: &mut dyn HostCallbacks) {
        if self.state != VMState::Running {
            return;
        }
        loop {
            let commands = match self.program.passages.get(&self.passage) {
                Some(passage) => &passage.commands,
                None => {
                    self.fail(host, VmError::UnknownJumpTarget(self.passage.clone()));
                    return;
                }
            };

            if self.ip >= commands.len() {
                self.end_of_passage(host);
                return;
            }

            let command = commands[self.ip].clone();
            trace!("{}@{}: {:?}", self.passage, self.ip, command);
            match self.execute(&command, host) {
                Ok(ControlFlow::Continue) => {
                    self.ip += 1;
                }
                Ok(ControlFlow::Jump) => {
                    // ip already set by the command itself
                }
                Ok(ControlFlow::Suspend) => {
                    return;
                }
                Err(err) => {
                    self.fail(host, err);
                    return;
                }
            }
        }
    }

    fn end_of_passage(&mut self, host: &mut dyn HostCallbacks) {
        if !self.text_buffer.is_empty() {
            self.flush_text(host);
            self.state = VMState::ScreenPause;
        } else if !self.selections.is_empty() {
            host.set_selections(&self.selections);
            self.state = VMState::WaitingForSelection;
        } else {
            self.state = VMState::Stopped;
        }
    }

    fn execute(&mut self, command: &Command, host: &mut dyn HostCallbacks) -> Result<ControlFlow, VmError> {
        match command {
            Command::PrintText { text } => {
                self.text_buffer.push_str(text);
                Ok(ControlFlow::Continue)
            }
            Command::Pause => {
                if !self.text_buffer.is_empty() {
                    self.flush_text(host);
                    self.state = VMState::ScreenPause;
                    self.ip += 1;
                    return Ok(ControlFlow::Suspend);
                }
                Ok(ControlFlow::Continue)
            }
            Command::JumpToPassage { target } => {
                if !self.program.passages.contains_key(target) {
                    return Err(VmError::UnknownJumpTarget(target.clone()));
                }
                debug!("jump {} -> {}", self.passage, target);
                self.passage = target.clone();
                self.ip = 0;
                Ok(ControlFlow::Jump)
            }
            Command::CallPassage { target } => {
                if !self.program.passages.contains_key(target) {
                    return Err(VmError::UnknownCallTarget(target.clone()));
                }
                self.call_stack.push(CallFrame {
                    passage: self.passage.clone(),
                    return_ip: self.ip + 1,
                })?;
                debug!("call {} -> {}", self.passage, target);
                self.passage = target.clone();
                self.ip = 0;
                Ok(ControlFlow::Jump)
            }
            Command::ReturnPassage => {
                let frame = self.call_stack.pop()?;
                self.passage = frame.passage;
                self.ip = frame.return_ip;
                Ok(ControlFlow::Jump)
            }
            Command::SetMusic { name, track } => {
                let track = self.eval(track)?.as_int();
                host.set_music(name, track);
                Ok(ControlFlow::Continue)
            }
            Command::SetImage { name } => {
                host.set_image(name);
                Ok(ControlFlow::Continue)
            }
            Command::AddSelection { text, target } => {
                if !self.program.passages.contains_key(target) {
                    return Err(VmError::UnknownSelectionTarget(target.clone()));
                }
                self.selections.push(Selection { text: text.clone(), target: target.clone() });
                Ok(ControlFlow::Continue)
            }
            Command::If { condition, skip_count } => {
                if self.eval(condition)?.as_bool() {
                    Ok(ControlFlow::Continue)
                } else {
                    self.ip += skip_count;
                    Ok(ControlFlow::Jump)
                }
            }
            Command::SetVariable { name, expr } => {
                let value = self.eval(expr)?;
                self.variables.insert(name.clone(), value);
                Ok(ControlFlow::Continue)
            }
            Command::PrintResult { expr } => {
                let value = self.eval(expr)?;
                self.text_buffer.push_str(&value.as_string());
                Ok(ControlFlow::Continue)
            }
        }
    }

    fn eval(&mut self, expr: &Expression) -> Result<Value, VmError> {
        match expr {
            Expression::Int(n) => Ok(Value::Int(*n)),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Variable(name) => Ok(self
                .variables
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()))),
            Expression::FunctionCall(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                call_builtin(name, &values, &mut self.rng)
            }
            Expression::Unary(op, inner) => {
                let value = self.eval(inner)?;
                Ok(match op {
                    UnaryOp::LogicalNot => Value::Bool(!value.as_bool()),
                    UnaryOp::Negate => Value::Int(-value.as_int()),
                })
            }
            Expression::Binary(BinaryOp::Or, left, right) => {
                let lv = self.eval(left)?;
                if lv.as_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.as_bool()))
            }
            Expression::Binary(BinaryOp::And, left, right) => {
                let lv = self.eval(left)?;
                if !lv.as_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.as_bool()))
            }
            Expression::Binary(op, left, right) => {
                let lv = self.eval(left)?;
                let rv = self.eval(right)?;
                let (a, b) = (lv.as_int(), rv.as_int());
                match op {
                    BinaryOp::Eq => Ok(Value::Bool(a == b)),
                    BinaryOp::NotEq => Ok(Value::Bool(a != b)),
                    BinaryOp::Lt => Ok(Value::Bool(a < b)),
                    BinaryOp::Gt => Ok(Value::Bool(a > b)),
                    BinaryOp::Le => Ok(Value::Bool(a <= b)),
                    BinaryOp::Ge => Ok(Value::Bool(a >= b)),
                    BinaryOp::Add => Ok(Value::Int(a + b)),
                    BinaryOp::Sub => Ok(Value::Int(a - b)),
                    BinaryOp::Mul => Ok(Value::Int(a * b)),
                    // `checked_div`/`checked_rem` also catch i32::MIN / -1
                    // overflow, not just the zero divisor.
                    BinaryOp::Div => a.checked_div(b).map(Value::Int).ok_or(VmError::DivisionByZero),
                    BinaryOp::Rem => a.checked_rem(b).map(Value::Int).ok_or(VmError::DivisionByZero),
                    BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
                }
            }
        }
    }

    /// Word-wrap the text buffer to `line_max_len`, split on `\n` within
    /// each wrapped paragraph, flush the first page, stash the rest.
    fn flush_text(&mut self, host: &mut dyn HostCallbacks) {
        let wrapped = wrap_text(&self.text_buffer, self.config.line_max_len);
        self.text_buffer.clear();
        self.pending_lines = wrapped;
        self.emit_page(host);
    }

    fn emit_page(&mut self, host: &mut dyn HostCallbacks) {
        let take = PAGE_SIZE.min(self.pending_lines.len());
        let page: Vec<String> = self.pending_lines[..take].to_vec();
        host.set_text(&page.join("\n"));
        if self.pending_lines.len() > PAGE_SIZE {
            self.pending_lines.drain(..PAGE_STRIDE);
        } else {
            self.pending_lines.clear();
        }
    }

    /// Drive a `player_input` event into the VM: advances paging while in
    /// `ScreenPause`, or resolves a selection while `WaitingForSelection`.
    /// Ignored while `Running` or `Stopped`.
    pub fn player_input(&mut self, index: Option<usize>, host: &mut dyn HostCallbacks) {
        match self.state {
            VMState::ScreenPause => {
                if self.pending_lines.is_empty() {
                    self.state = VMState::Running;
                } else {
                    self.emit_page(host);
                }
            }
            VMState::WaitingForSelection => {
                let Some(index) = index else { return };
                if index >= self.selections.len() {
                    return;
                }
                let target = self.selections[index].target.clone();
                self.passage = target;
                self.ip = 0;
                self.selections.clear();
                host.set_selections(&[]);
                self.state = VMState::Running;
            }
            VMState::Running | VMState::Stopped => {}
        }
    }

    fn fail(&mut self, host: &mut dyn HostCallbacks, err: VmError) {
        host.fatal_error(&err.to_string());
        self.state = VMState::Stopped;
    }
}

enum ControlFlow {
    Continue,
    Jump,
    Suspend,
}

/// Greedy word wrap at `width` columns, one output line per input line plus
/// any induced wraps. An empty input line yields no output lines (there are
/// no blank lines to page through).
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            continue;
        }
        let mut current = String::new();
        for word in raw_line.split(' ') {
            if current.is_empty() {
                current.push_str(word);
            } else if current.len() + 1 + word.len() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;

    #[derive(Default)]
    struct MockHost {
        texts: Vec<String>,
        images: Vec<String>,
        selections: Vec<Vec<Selection>>,
        fatal: Vec<String>,
    }

    impl HostCallbacks for MockHost {
        fn set_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }
        fn set_image(&mut self, name: &str) {
            self.images.push(name.to_string());
        }
        fn set_music(&mut self, _name: &str, _track: i32) {}
        fn set_selections(&mut self, selections: &[Selection]) {
            self.selections.push(selections.to_vec());
        }
        fn fatal_error(&mut self, message: &str) {
            self.fatal.push(message.to_string());
        }
    }

    fn vm_for(source: &str) -> Vm {
        let program = Program::parse(source).unwrap();
        Vm::new(program, VmConfig::default(), 1)
    }

    #[test]
    fn hello_pause_stop() {
        let mut vm = vm_for("::Start\nHello<<pause>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::ScreenPause);
        assert_eq!(host.texts, vec!["Hello".to_string()]);

        vm.player_input(None, &mut host);
        assert_eq!(vm.state(), VMState::Running);
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::Stopped);
    }

    #[test]
    fn selection_round_trip() {
        let source = "::Start\nPick:\n* [[Left|L]]\n* [[Right|R]]\n::L\nWent left.<<pause>>\n::R\nWent right.<<pause>>\n";
        let mut vm = vm_for(source);
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::WaitingForSelection);
        assert_eq!(
            host.selections.last().unwrap(),
            &vec![
                Selection { text: "Left".into(), target: "L".into() },
                Selection { text: "Right".into(), target: "R".into() },
            ]
        );

        vm.player_input(Some(1), &mut host);
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::ScreenPause);
        assert_eq!(host.texts.last().unwrap(), "Went right.");
    }

    #[test]
    fn arithmetic_and_print() {
        let mut vm = vm_for("::Start\n<<set x = 2>><<set y = 3>><<print x * y + 1>><<pause>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(host.texts, vec!["7".to_string()]);
    }

    #[test]
    fn short_circuit_or_skips_division_by_zero() {
        let mut vm = vm_for("::Start\n<<set x = 0>><<if true or (1/x)>>ok<<endif>><<pause>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::ScreenPause);
        assert_eq!(host.texts, vec!["ok".to_string()]);
        assert!(host.fatal.is_empty());
    }

    #[test]
    fn call_then_return_restores_ip() {
        let source = "::Start\nA<<call Sub>>B<<pause>>\n::Sub\n[sub]<<return>>\n";
        let mut vm = vm_for(source);
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(host.texts, vec!["A[sub]B".to_string()]);
    }

    #[test]
    fn unknown_jump_target_is_fatal() {
        let mut vm = vm_for("::Start\n<<jump Nowhere>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::Stopped);
        assert_eq!(host.fatal, vec!["Unknown jump target \"Nowhere\".".to_string()]);
    }

    #[test]
    fn empty_passage_body_stops_immediately() {
        let mut vm = vm_for("::Start\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::Stopped);
        assert!(host.texts.is_empty());
    }

    #[test]
    fn only_pause_command_emits_nothing() {
        let mut vm = vm_for("::Start\n<<pause>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        // empty text buffer at Pause: no-op per the guard in §4.5, so the
        // passage simply runs to completion and stops.
        assert_eq!(vm.state(), VMState::Stopped);
        assert!(host.texts.is_empty());
    }

    #[test]
    fn paging_overlap_slides_window_by_five() {
        let long_text = (1..=8).map(|n| format!("line{}", n)).collect::<Vec<_>>().join("\n");
        let source = format!("::Start\n{}<<pause>>\n", long_text);
        let mut vm = vm_for(&source);
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::ScreenPause);
        let first_page = host.texts.last().unwrap().clone();
        let first_lines: Vec<&str> = first_page.split('\n').collect();
        assert_eq!(first_lines.len(), 6);

        vm.player_input(None, &mut host);
        let second_page = host.texts.last().unwrap().clone();
        let second_lines: Vec<&str> = second_page.split('\n').collect();
        assert_eq!(first_lines[5], second_lines[0]);
    }

    #[test]
    fn division_by_zero_is_fatal_not_a_panic() {
        let mut vm = vm_for("::Start\n<<print 1/0>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::Stopped);
        assert_eq!(host.fatal, vec!["Division by zero.".to_string()]);
    }

    #[test]
    fn remainder_by_zero_is_fatal_not_a_panic() {
        let mut vm = vm_for("::Start\n<<print 1%0>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(vm.state(), VMState::Stopped);
        assert_eq!(host.fatal, vec!["Division by zero.".to_string()]);
    }

    #[test]
    fn if_with_empty_body_is_a_noop_when_true() {
        let mut vm = vm_for("::Start\n<<if true>><<endif>>after<<pause>>\n");
        let mut host = MockHost::default();
        vm.run(&mut host);
        assert_eq!(host.texts, vec!["after".to_string()]);
    }
}
