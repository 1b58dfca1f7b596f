//! Collaborator contracts for turning contract source into stubbed calls.
//!
//! Parsing and stub decomposition live outside the engine. A front end
//! implements [`DslParser`] for its program representation and
//! [`StubDecomposer`] for the sequence of stubs derived from it.
//! [`manifest::ManifestFrontend`] implements both over pre-decomposed
//! JSON manifests.

use std::fmt;

use callgraph_state::CallId;

use crate::domain::{DecompositionError, ParseError, StubbedCall};

pub mod manifest;

pub use manifest::{ManifestFrontend, ManifestStub, StubManifest};

/// Lazy, one-shot sequence of stubs. Each item may fail independently.
pub type StubSequence<'a, E> =
    Box<dyn Iterator<Item = Result<StubbedCall<E>, DecompositionError>> + Send + 'a>;

/// Parses contract source text into a program representation.
pub trait DslParser: Send + Sync {
    type Module: Send + Sync;
    /// Expression type; `Display` gives its serialized form.
    type Expr: Clone + fmt::Display + Send + Sync + 'static;

    fn parse(&self, source: &str) -> Result<Self::Module, ParseError>;

    /// The top-level expression to decompose.
    fn top_level_expr(&self, module: &Self::Module) -> Result<Self::Expr, ParseError>;
}

/// Decomposes a parsed program into stubbed calls.
///
/// Stubs are emitted so that a call's dependencies always precede it, and
/// the sequence is finite.
pub trait StubDecomposer<P: DslParser>: Send + Sync {
    fn decompose<'a>(
        &'a self,
        root_id: &CallId,
        module: &'a P::Module,
        expr: P::Expr,
    ) -> StubSequence<'a, P::Expr>;
}
