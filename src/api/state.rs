use std::sync::Arc;

use crate::config::Config;
use crate::queue::{JobRunner, PendingList};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pending: Arc<PendingList>,
    pub runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(config: Arc<Config>, pending: Arc<PendingList>, runner: Arc<JobRunner>) -> Self {
        Self {
            config,
            pending,
            runner,
        }
    }
}
