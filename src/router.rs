//! First-match routing over the mock definition set.
//!
//! Definitions are evaluated in load order; the first pattern that matches
//! wins. The router is pure: no-match is reported to the caller, which owns
//! the fallback response.

use crate::definition::{InboundRequest, MockDefinition, RouteParams};
use crate::matcher::CompiledPattern;
use tracing::debug;

/// Result of routing a request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched mock definition
    pub mock: &'a MockDefinition,
    /// Route parameters bound during path/body template matching
    pub params: RouteParams,
}

/// Router over a fixed, ordered mock definition set.
pub struct Router {
    patterns: Vec<CompiledPattern>,
}

impl Router {
    /// Compile the patterns of all definitions. Fails if any pattern does
    /// not compile; `MockDefinition::validate` reports the same errors with
    /// positional context earlier, at load time.
    pub fn new(mocks: &[MockDefinition]) -> anyhow::Result<Self> {
        let patterns = mocks
            .iter()
            .map(|mock| {
                CompiledPattern::compile(&mock.request)
                    .map_err(|e| anyhow::anyhow!("mock {:?}: {}", mock.name, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Find the first definition matching the request.
    pub fn route<'a>(
        &self,
        mocks: &'a [MockDefinition],
        req: &InboundRequest,
    ) -> Option<RouteMatch<'a>> {
        for (mock, pattern) in mocks.iter().zip(&self.patterns) {
            if let Some(params) = pattern.matches(&mock.request, req) {
                debug!(mock = %mock.name, path = %req.path, "request matched");
                return Some(RouteMatch { mock, params });
            }
        }
        None
    }
}
