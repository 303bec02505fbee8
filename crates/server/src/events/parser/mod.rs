//! One module per source log format.
//!
//! Routing is the aggregator's job: each parser only ever sees lines from
//! its own backend query, so there is no format sniffing here. Parsers are
//! pure — a non-matching or malformed line yields `None`, never an error.

pub mod action;
pub mod audit;
pub mod plan;
pub mod signup;

use crate::backend::RawLine;
use crate::events::model::PlatformEvent;

pub trait EventParser: Send + Sync {
    /// Map one raw line (plus its source-assigned timestamp) to zero or one
    /// event.
    fn parse(&self, line: &RawLine) -> Option<PlatformEvent>;
}
