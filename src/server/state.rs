use std::time::Duration;

use crate::pipeline::Extractor;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) extractor: Extractor,
    pub(crate) request_timeout: Duration,
}
