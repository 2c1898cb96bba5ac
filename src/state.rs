use crate::services::{admin_service::AdminService, auth_service::Authenticator};
use std::sync::Arc;

/// Shared state carried by the router to every handler.
#[derive(Clone)]
pub struct AppState {
    pub admin: AdminService,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(admin: AdminService, auth: Arc<dyn Authenticator>) -> Self {
        Self { admin, auth }
    }
}
