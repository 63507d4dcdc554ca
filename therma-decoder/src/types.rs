//! Core types for the heat-pump protocol decoder
//!
//! This module defines the values the decoder emits, the identifiers those
//! values are keyed by, and the error type shared by every component.

use crate::bus::BusVariable;
use crate::modes::{IuOperationMode, OperationMode};
use serde::{Serialize, Serializer};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while framing, exchanging or decoding packets
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Unrecognised frame {}{}", hex(.bytes), request_suffix(.request))]
    MalformedFrame {
        /// Bytes buffered so far, starting with the offending leading byte
        bytes: Vec<u8>,
        /// The request that triggered this frame, if it was a response
        request: Option<Vec<u8>>,
    },

    #[error(
        "Wrong checksum: expected {expected:#04x} but found {actual:#04x} in {} for {}",
        hex(.frame),
        hex(.request)
    )]
    ChecksumMismatch {
        expected: u8,
        actual: u8,
        frame: Vec<u8>,
        request: Vec<u8>,
    },

    #[error("Unsupported conversion {conversion_id} in {line:?}")]
    UnsupportedConversion { conversion_id: u32, line: String },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid decoder table: {} issue(s), first: {}", .0.len(), first_issue(.0))]
    InvalidTable(Vec<crate::validate::TableIssue>),

    #[error("Timed out waiting for a response: {received} of {requested} bytes received")]
    Timeout { requested: usize, received: usize },

    #[error("Device busy: {pending} unread response byte(s) left from the previous command")]
    DeviceBusy { pending: usize },

    #[error("Unknown command: {}", hex(.0))]
    UnknownCommand(Vec<u8>),

    #[error("Read too large: {requested} bytes requested, {available} available")]
    ReadOverrun { requested: usize, available: usize },

    #[error("Framer does not accept empty writes")]
    EmptyWrite,

    #[error("Failed to parse monitor line: {0:?}")]
    MonitorLine(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn request_suffix(request: &Option<Vec<u8>>) -> String {
    match request {
        Some(request) => format!(" in response to {}", hex(request)),
        None => String::new(),
    }
}

fn first_issue(issues: &[crate::validate::TableIssue]) -> String {
    issues
        .first()
        .map(|issue| issue.to_string())
        .unwrap_or_default()
}

/// Format bytes as space separated lowercase hex, e.g. `03 40 21 9b`
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable key naming one decoded engineering quantity
///
/// Native tables use the numbers shown by the service tool, imported tables
/// use synthetic `"registry.offset.conversion"` strings, and the bus table
/// uses symbolic names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableId {
    /// Service tool variable number
    Number(u32),
    /// Identifier manufactured for imported definitions
    Synthetic(String),
    /// Symbolic bus variable
    Bus(BusVariable),
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableId::Number(n) => write!(f, "{}", n),
            VariableId::Synthetic(s) => write!(f, "{}", s),
            VariableId::Bus(v) => write!(f, "{}", v),
        }
    }
}

impl From<u32> for VariableId {
    fn from(n: u32) -> Self {
        VariableId::Number(n)
    }
}

impl From<String> for VariableId {
    fn from(s: String) -> Self {
        VariableId::Synthetic(s)
    }
}

impl From<&str> for VariableId {
    fn from(s: &str) -> Self {
        VariableId::Synthetic(s.to_string())
    }
}

impl From<BusVariable> for VariableId {
    fn from(v: BusVariable) -> Self {
        VariableId::Bus(v)
    }
}

/// A decoded register value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Unscaled byte or word
    Integer(i64),
    /// Scaled byte or word
    Float(f64),
    /// Single bit
    Boolean(bool),
    /// Outdoor unit operation mode
    OperationMode(OperationMode),
    /// Indoor unit operation mode
    IuOperationMode(IuOperationMode),
}

impl Value {
    /// Convert value to f64, if it is numeric or boolean
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::OperationMode(_) | Value::IuOperationMode(_) => None,
        }
    }

    /// Convert value to i64, if it is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the boolean, if this is a bit value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", if *v { "ON" } else { "OFF" }),
            Value::OperationMode(m) => write!(f, "{}", m),
            Value::IuOperationMode(m) => write!(f, "{}", m),
        }
    }
}

/// Values serialize to their plain JSON equivalent; modes as their labels
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::OperationMode(m) => serializer.serialize_str(m.label()),
            Value::IuOperationMode(m) => serializer.serialize_str(m.label()),
        }
    }
}
