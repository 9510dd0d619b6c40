use std::sync::Arc;

use crate::processing::MarkerSet;
use crate::settings::Settings;

// Built once before the server starts; handlers only read it.
#[derive(Clone)]
pub struct AppState {
    pub marker_set: Arc<MarkerSet>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(marker_set: MarkerSet, settings: Settings) -> Self {
        Self {
            marker_set: Arc::new(marker_set),
            settings: Arc::new(settings),
        }
    }
}
