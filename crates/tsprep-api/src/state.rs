use std::sync::Arc;

use tsprep_repository::SeriesRepository;
use tsprep_service::PreprocessingService;

/// Shared handler state. The service is stateless, so one instance serves
/// every request concurrently.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PreprocessingService>,
}

impl AppState {
    pub fn new(repository: Arc<dyn SeriesRepository>) -> Self {
        Self {
            service: Arc::new(PreprocessingService::new(repository)),
        }
    }
}
