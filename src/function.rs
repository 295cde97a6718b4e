//! Function: an opaque computation descriptor plus a handle to its container image.

use std::fmt;
use std::sync::Arc;

/// The immutable container blob that must be present in a compute node's
/// RAM before its function can run (GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Image {
    pub file_id: String,
    pub size_bytes: u64,
}

impl Image {
    pub fn new(file_id: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_id: file_id.into(),
            size_bytes,
        }
    }
}

/// Opaque input handed to a function invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInput(pub Vec<u8>);

/// Opaque output produced by a function invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionOutput(pub Vec<u8>);

/// Per-invocation scratch storage: a transient byte buffer carved from the
/// target node's disk budget, the computation's only writable location.
#[derive(Debug, Default)]
pub struct Scratch {
    pub capacity_bytes: u64,
    used_bytes: u64,
}

impl Scratch {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
        }
    }

    /// Reserve `bytes` of scratch space. Fails if it would exceed capacity.
    pub fn write(&mut self, bytes: u64) -> Result<(), ()> {
        if self.used_bytes + bytes > self.capacity_bytes {
            return Err(());
        }
        self.used_bytes += bytes;
        Ok(())
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }
}

/// The computation a function performs, deterministic and non-blocking:
/// either a pure FLOP count, or a pure callback over the invocation's
/// input and scratch handle.
#[derive(Clone)]
pub enum FunctionBody {
    /// A deterministic simulated computation, expressed as a duration in FLOPs.
    Flops(f64),
    /// A pure function over the invocation's input and scratch store. Must
    /// not block or spawn further actors.
    Callback(Arc<dyn Fn(&FunctionInput, &mut Scratch) -> FunctionOutput + Send + Sync>),
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::Flops(flops) => f.debug_tuple("Flops").field(flops).finish(),
            FunctionBody::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// A named computation plus a handle to its container image.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub body: FunctionBody,
    pub image: Image,
}

impl Function {
    pub fn new(name: impl Into<String>, body: FunctionBody, image: Image) -> Self {
        Self {
            name: name.into(),
            body,
            image,
        }
    }

    /// Run the function's computation, returning the FLOP count to simulate
    /// and (for callback functions) the resulting output.
    pub fn execute(&self, input: &FunctionInput, scratch: &mut Scratch) -> (f64, Option<FunctionOutput>) {
        match &self.body {
            FunctionBody::Flops(flops) => (*flops, None),
            FunctionBody::Callback(callback) => (0.0, Some(callback(input, scratch))),
        }
    }
}
