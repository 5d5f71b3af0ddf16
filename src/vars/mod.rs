//! Template-resolution pipeline.
//!
//! One filler per tag namespace, driven as an ordered chain over every
//! templated field of the matched mock: persist names and action contents
//! first (so entity names are concrete before content reads), then the
//! notify fields, the response body, and each response header. Unresolved
//! tags are left verbatim so a consumer can see which tag failed.

pub mod fake;
pub mod persist;
pub mod request;
pub mod storage;

pub use fake::FakeFiller;
pub use persist::PersistFiller;
pub use request::RequestFiller;
pub use storage::StorageFiller;

use crate::definition::{InboundRequest, MockDefinition, RouteParams};
use crate::fakedata::DataFaker;
use crate::persist::EngineRegistry;
use std::sync::Arc;

/// A tag-resolution strategy for one namespace. Fillers recognize only
/// their own `{{ <namespace>.<selector> }}` tags and pass everything else
/// through unchanged.
pub trait Filler {
    fn fill(&self, mock: &MockDefinition, input: &str, multiple_match: bool) -> String;
}

/// Strip the `{{` `}}` delimiters and surrounding whitespace from a raw tag.
pub(crate) fn tag_inner(raw: &str) -> &str {
    raw[2..raw.len() - 2].trim()
}

/// Filler namespaces, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerKind {
    Request,
    Fake,
    Persist,
    Storage,
}

/// Default chain. Request runs first so nested arguments are materialized
/// before Storage parses its call-style selectors; Storage runs last and
/// iterates internally.
pub const DEFAULT_CHAIN: [FillerKind; 4] = [
    FillerKind::Request,
    FillerKind::Fake,
    FillerKind::Persist,
    FillerKind::Storage,
];

/// Drives the filler chain over a matched mock.
pub struct VarsProcessor {
    chain: Vec<FillerKind>,
    fake: Arc<dyn DataFaker>,
    engines: Arc<EngineRegistry>,
}

impl VarsProcessor {
    /// Create a processor with the default chain.
    pub fn new(fake: Arc<dyn DataFaker>, engines: Arc<EngineRegistry>) -> Self {
        Self {
            chain: DEFAULT_CHAIN.to_vec(),
            fake,
            engines,
        }
    }

    /// Override the chain order.
    pub fn with_chain(mut self, chain: Vec<FillerKind>) -> Self {
        self.chain = chain;
        self
    }

    /// Resolve every templated field of the matched mock in place.
    /// Collection mode applies to the response body only, and only when the
    /// mock declares a collection.
    pub fn eval(&self, req: &InboundRequest, params: &RouteParams, mock: &mut MockDefinition) {
        let multiple_match = !mock.persist.collection.is_empty();

        let request_filler = RequestFiller::new(req, params);
        let fake_filler = FakeFiller::new(self.fake.as_ref());
        let persist_filler = PersistFiller::new(&self.engines);
        let storage_filler = StorageFiller::new(&self.engines);

        let run = |mock: &MockDefinition, input: &str, multiple: bool| -> String {
            let mut text = input.to_string();
            for kind in &self.chain {
                let filler: &dyn Filler = match kind {
                    FillerKind::Request => &request_filler,
                    FillerKind::Fake => &fake_filler,
                    FillerKind::Persist => &persist_filler,
                    FillerKind::Storage => &storage_filler,
                };
                text = filler.fill(mock, &text, multiple);
            }
            text
        };

        // Persist names and action contents
        mock.persist.entity = run(mock, &mock.persist.entity.clone(), false);
        mock.persist.entity_id = run(mock, &mock.persist.entity_id.clone(), false);
        mock.persist.collection = run(mock, &mock.persist.collection.clone(), false);
        let action_names: Vec<String> = mock.persist.actions.keys().cloned().collect();
        for name in action_names {
            let content = mock.persist.actions[&name].clone();
            let filled = run(mock, &content, false);
            mock.persist.actions.insert(name, filled);
        }

        // Notify fields
        if let Some(webhook) = mock.notify.webhook.clone() {
            let url = run(mock, &webhook.url, false);
            let body = run(mock, &webhook.body, false);
            if let Some(webhook) = mock.notify.webhook.as_mut() {
                webhook.url = url;
                webhook.body = body;
            }
        }

        // Response body and headers
        mock.response.body = run(mock, &mock.response.body.clone(), multiple_match);
        let header_names: Vec<String> = mock.response.headers.keys().cloned().collect();
        for name in header_names {
            let value = mock.response.headers[&name].clone();
            let filled = run(mock, &value, false);
            mock.response.headers.insert(name, filled);
        }

        // A failed persist content read forces the whole response to a 404,
        // regardless of what else was templated
        if persist_filler.entity_missing() {
            mock.response.status = 404;
            mock.response.body.clear();
        }
    }
}
