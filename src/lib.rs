pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod function;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use log::{debug, info};

use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::output::Output;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;
use crate::value::Value;

/// One interpreter session: a persistent global environment plus the
/// diagnostics sink.  A script is one [`Lox::run`]; the prompt calls it once
/// per line against the same session.
pub struct Lox {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Session whose program output goes to `output`.
    pub fn with_output(output: Box<dyn Output>) -> Self {
        Self::with_interpreter(Interpreter::with_output(output))
    }

    fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            diagnostics: Diagnostics::new(),
            next_id: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Scan, parse, resolve and execute `source` as a program.
    ///
    /// Static errors stop the pass before anything runs; a runtime fault
    /// stops the remaining top‑level statements.  Both end up in
    /// [`Lox::diagnostics`].
    pub fn run(&mut self, source: &str) {
        info!("Running source of {} bytes", source.len());

        let Some(tokens) = self.scan(source) else {
            return;
        };

        let mut parser = Parser::new(&tokens).starting_at(self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        let statements: Vec<Stmt> = match parsed {
            Ok(statements) => statements,
            Err(errors) => return self.report_all(errors),
        };

        match Resolver::new().resolve(&statements) {
            Ok(locals) => self.interpreter.add_locals(locals),
            Err(errors) => return self.report_all(errors),
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            debug!("Runtime fault: {}", e);
            self.diagnostics.report(e);
        }
    }

    /// Evaluate `source` as a single expression and echo its value through
    /// the session's output.  Returns the value when evaluation succeeded.
    pub fn evaluate(&mut self, source: &str) -> Option<Value> {
        info!("Evaluating single expression");

        let tokens: Vec<Token> = self.scan(source)?;

        let mut parser = Parser::new(&tokens).starting_at(self.next_id);
        let parsed = parser.parse_expression();
        self.next_id = parser.next_id();

        let expr = match parsed {
            Ok(expr) => expr,
            Err(errors) => {
                self.report_all(errors);
                return None;
            }
        };

        match Resolver::new().resolve_expression(&expr) {
            Ok(locals) => self.interpreter.add_locals(locals),
            Err(errors) => {
                self.report_all(errors);
                return None;
            }
        }

        match self.interpreter.evaluate_expression(&expr) {
            Ok(value) => {
                self.interpreter.echo(&value);
                Some(value)
            }

            Err(e) => {
                self.diagnostics.report(e);
                None
            }
        }
    }

    fn scan(&mut self, source: &str) -> Option<Vec<Token>> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();

        if errors.is_empty() {
            Some(tokens)
        } else {
            self.report_all(errors);
            None
        }
    }

    fn report_all(&mut self, errors: Vec<LoxError>) {
        for error in errors {
            self.diagnostics.report(error);
        }
    }
}
