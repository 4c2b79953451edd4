//! Recording sessions for tests.
//!
//! Every session shares a [`Journal`] so tests can assert the order of
//! statements across the primary and secondary connections.

use super::{Connector, DbError, Row, Session};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// SQL of every executed statement, across sessions.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|e| e.split_once(" exec: ").map(|(_, sql)| sql.to_string()))
            .collect()
    }

    /// Index of the first entry containing `needle`.
    pub(crate) fn position(&self, needle: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e.contains(needle))
    }
}

struct Response {
    pattern: String,
    param: Option<String>,
    rows: Vec<Row>,
}

pub(crate) struct MockSession {
    name: &'static str,
    journal: Journal,
    responses: Vec<Response>,
    fail_on: Option<String>,
}

impl MockSession {
    pub(crate) fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            responses: Vec::new(),
            fail_on: None,
        }
    }

    /// Answer queries containing `pattern` with `rows`.
    pub(crate) fn with_rows(self, pattern: &str, rows: &[&[&str]]) -> Self {
        self.with_row_values(pattern, None, rows.iter().map(|r| Row::from_strs(r)).collect())
    }

    /// Answer queries containing `pattern` and bound to `param` with `rows`.
    pub(crate) fn with_rows_for(self, pattern: &str, param: &str, rows: &[&[&str]]) -> Self {
        self.with_row_values(
            pattern,
            Some(param),
            rows.iter().map(|r| Row::from_strs(r)).collect(),
        )
    }

    pub(crate) fn with_row_values(mut self, pattern: &str, param: Option<&str>, rows: Vec<Row>) -> Self {
        self.responses.push(Response {
            pattern: pattern.to_string(),
            param: param.map(str::to_string),
            rows,
        });
        self
    }

    /// Fail any statement containing `pattern`.
    pub(crate) fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    fn fails(&self, sql: &str) -> bool {
        self.fail_on.as_deref().is_some_and(|p| sql.contains(p))
    }
}

impl Session for MockSession {
    fn query(&mut self, sql: &str, params: &[&str]) -> std::result::Result<Vec<Row>, DbError> {
        self.journal
            .push(format!("{} query: {sql} {params:?}", self.name));
        if self.fails(sql) {
            return Err(DbError::Backend("injected failure".into()));
        }
        Ok(self
            .responses
            .iter()
            .find(|r| {
                sql.contains(&r.pattern)
                    && r.param.as_deref().is_none_or(|p| params.contains(&p))
            })
            .map(|r| r.rows.clone())
            .unwrap_or_default())
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<u64, DbError> {
        if self.fails(sql) {
            self.journal.push(format!("{} failed: {sql}", self.name));
            return Err(DbError::Backend("injected failure".into()));
        }
        self.journal.push(format!("{} exec: {sql}", self.name));
        Ok(0)
    }

    fn close(self: Box<Self>) -> std::result::Result<(), DbError> {
        self.journal.push(format!("{} close", self.name));
        Ok(())
    }
}

pub(crate) struct MockConnector {
    journal: Journal,
    sessions: RefCell<VecDeque<MockSession>>,
}

impl MockConnector {
    pub(crate) fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            sessions: RefCell::default(),
        }
    }

    pub(crate) fn with_session(self, session: MockSession) -> Self {
        self.sessions.borrow_mut().push_back(session);
        self
    }
}

impl Connector for MockConnector {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn Session>> {
        self.journal.push(format!("connect {connection_string}"));
        match self.sessions.borrow_mut().pop_front() {
            Some(session) => Ok(Box::new(session)),
            None => Err(Error::Connection {
                target: connection_string.to_string(),
                message: "no mock session available".into(),
            }),
        }
    }
}
