//! Input file parser.
//!
//! ```text
//! n l a m
//! i j k ...
//! ```
//!
//! The header carries the node count, the mean inter-arrival time in
//! milliseconds, the send bias and the send quota. Each following line
//! names a node (1-based) and then the nodes it is adjacent to. Every listed
//! pair becomes one undirected edge; repeats collapse. Blank lines are
//! skipped, and a node need not have a line of its own.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use causim_clock::AlgorithmKind;
use causim_core::{NodeId, SimParams};
use causim_engine::{ConfigError, SimConfig, Topology, TopologyError};

/// Errors from reading or interpreting an input file.
#[derive(Debug)]
pub enum InputError {
    /// The file could not be read.
    Io(io::Error),
    /// The input has no non-blank line.
    MissingHeader,
    /// The header does not have exactly four fields.
    HeaderArity {
        /// Number of fields found.
        found: usize,
    },
    /// A token did not parse as the expected kind of number.
    BadNumber {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
        /// What the token should have been.
        expected: &'static str,
    },
    /// A node id is `0` or larger than `n`.
    NodeOutOfRange {
        /// 1-based line number.
        line: usize,
        /// The offending 1-based id.
        id: usize,
        /// Node count from the header.
        node_count: usize,
    },
    /// The edges do not form a valid topology.
    Topology(TopologyError),
    /// The parameters and topology fail validation.
    Config(ConfigError),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "reading input: {e}"),
            Self::MissingHeader => write!(f, "input is empty, expected a \"n l a m\" header"),
            Self::HeaderArity { found } => {
                write!(f, "header has {found} field(s), expected 4: n l a m")
            }
            Self::BadNumber {
                line,
                token,
                expected,
            } => write!(f, "line {line}: {token:?} is not {expected}"),
            Self::NodeOutOfRange {
                line,
                id,
                node_count,
            } => write!(f, "line {line}: node {id} is outside 1..={node_count}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Topology(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for InputError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<TopologyError> for InputError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<ConfigError> for InputError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// A parsed input file: parameters plus zero-based undirected edges.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSpec {
    /// Header values.
    pub params: SimParams,
    /// Edges as listed, converted to zero-based ids. May contain repeats.
    pub edges: Vec<(NodeId, NodeId)>,
}

impl InputSpec {
    /// Build the topology.
    pub fn topology(&self) -> Result<Topology, InputError> {
        Ok(Topology::new(self.params.node_count, &self.edges)?)
    }

    /// Build and validate a run configuration.
    pub fn into_config(self, algorithm: AlgorithmKind, seed: u64) -> Result<SimConfig, InputError> {
        let topology = self.topology()?;
        let config = SimConfig::new(self.params, topology, algorithm).with_seed(seed);
        config.validate()?;
        Ok(config)
    }
}

/// Read and parse the file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<InputSpec, InputError> {
    parse(&fs::read_to_string(path)?)
}

/// Parse input text.
pub fn parse(text: &str) -> Result<InputSpec, InputError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (header_line, header) = lines.next().ok_or(InputError::MissingHeader)?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(InputError::HeaderArity {
            found: fields.len(),
        });
    }
    let params = SimParams {
        node_count: number(header_line, fields[0], "a node count")?,
        mean_interarrival_ms: number(header_line, fields[1], "a mean inter-arrival time")?,
        send_bias: number(header_line, fields[2], "a send bias")?,
        send_quota: number(header_line, fields[3], "a send quota")?,
    };

    let mut edges = Vec::new();
    for (line, text) in lines {
        let mut ids = text
            .split_whitespace()
            .map(|token| node_id(line, token, params.node_count));
        let Some(from) = ids.next().transpose()? else {
            continue;
        };
        for to in ids {
            edges.push((from, to?));
        }
    }

    Ok(InputSpec { params, edges })
}

fn number<T: FromStr>(line: usize, token: &str, expected: &'static str) -> Result<T, InputError> {
    token.parse().map_err(|_| InputError::BadNumber {
        line,
        token: token.to_string(),
        expected,
    })
}

/// 1-based id on the page, zero-based [`NodeId`] in memory.
fn node_id(line: usize, token: &str, node_count: usize) -> Result<NodeId, InputError> {
    let id: usize = number(line, token, "a node id")?;
    if id == 0 || id > node_count {
        return Err(InputError::NodeOutOfRange {
            line,
            id,
            node_count,
        });
    }
    Ok(NodeId((id - 1) as u32))
}
