//! Open/exhausted bookkeeping and the single-tuple lookahead shared by every operator.
//!
//! An operator embeds an [`OpLifecycle`], implements [`FetchNext`], and forwards
//! `has_next`/`next` of its [`OpIterator`](super::OpIterator) impl to
//! [`OpLifecycle::has_next`] and [`OpLifecycle::next`].

use common::{CrustyError, Tuple};

/// State of an operator between `open` and `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Closed,
    Open,
    /// Open, and `fetch_next` has reported the end of the sequence.
    Exhausted,
}

/// The one method an operator has to supply on top of its lifecycle.
pub trait FetchNext {
    /// Lifecycle state embedded in the operator.
    fn lifecycle(&mut self) -> &mut OpLifecycle;

    /// Computes the next output tuple, or None at the end of the sequence.
    ///
    /// Only called while the operator is open and not exhausted.
    fn fetch_next(&mut self) -> Result<Option<Tuple>, CrustyError>;
}

#[derive(Debug)]
pub struct OpLifecycle {
    /// Name used in protocol errors and logs.
    name: &'static str,
    state: OpState,
    lookahead: Option<Tuple>,
}

impl OpLifecycle {
    /// Creates a closed lifecycle for the operator `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: OpState::Closed,
            lookahead: None,
        }
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != OpState::Closed
    }

    /// Marks the operator as open. Callers do this last in `open`, after children
    /// and local cursors are ready.
    pub fn open(&mut self) -> Result<(), CrustyError> {
        self.ensure_closed()?;
        debug!("{}: open", self.name);
        self.state = OpState::Open;
        self.lookahead = None;
        Ok(())
    }

    /// Marks the operator as closed and drops the lookahead.
    pub fn close(&mut self) {
        if self.is_open() {
            debug!("{}: close", self.name);
        }
        self.state = OpState::Closed;
        self.lookahead = None;
    }

    /// Checks the operator may be rewound and clears exhaustion and the lookahead.
    ///
    /// Call before touching children so a misused operator leaves them alone.
    pub fn rewind(&mut self) -> Result<(), CrustyError> {
        self.ensure_open("rewind")?;
        debug!("{}: rewind", self.name);
        self.state = OpState::Open;
        self.lookahead = None;
        Ok(())
    }

    /// Returns a `ProtocolError` naming `call` unless the operator is open.
    pub fn ensure_open(&self, call: &str) -> Result<(), CrustyError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CrustyError::ProtocolError(format!(
                "{} called on {} before open",
                call, self.name
            )))
        }
    }

    /// Returns a `ProtocolError` if the operator is already open. Operators check this
    /// before opening their children.
    pub fn ensure_closed(&self) -> Result<(), CrustyError> {
        if self.is_open() {
            Err(CrustyError::ProtocolError(format!(
                "{} opened twice without close",
                self.name
            )))
        } else {
            Ok(())
        }
    }

    /// Fills the lookahead from `op.fetch_next()` if needed and reports whether a tuple
    /// is buffered. An error from `fetch_next` leaves state and lookahead untouched.
    pub fn has_next<O: FetchNext + ?Sized>(op: &mut O) -> Result<bool, CrustyError> {
        let lifecycle = op.lifecycle();
        lifecycle.ensure_open("has_next")?;
        if lifecycle.lookahead.is_some() {
            return Ok(true);
        }
        if lifecycle.state == OpState::Exhausted {
            return Ok(false);
        }
        match op.fetch_next()? {
            Some(tuple) => {
                op.lifecycle().lookahead = Some(tuple);
                Ok(true)
            }
            None => {
                let lifecycle = op.lifecycle();
                trace!("{}: exhausted", lifecycle.name);
                lifecycle.state = OpState::Exhausted;
                Ok(false)
            }
        }
    }

    /// Returns the buffered lookahead or the next fetched tuple.
    pub fn next<O: FetchNext + ?Sized>(op: &mut O) -> Result<Option<Tuple>, CrustyError> {
        if OpLifecycle::has_next(op)? {
            Ok(op.lifecycle().lookahead.take())
        } else {
            Ok(None)
        }
    }
}
