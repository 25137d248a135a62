use std::sync::Arc;

use crate::common::record::Environment;

use super::{MediaDevices, Platform, PositionProvider};

/// Host without sensors: only environment metadata is available.
pub struct HeadlessPlatform {
    environment: Environment,
}

impl HeadlessPlatform {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

impl Platform for HeadlessPlatform {
    fn environment(&self) -> Environment {
        self.environment.clone()
    }

    fn geolocation(&self) -> Option<Arc<dyn PositionProvider>> {
        None
    }

    fn media_devices(&self) -> Option<Arc<dyn MediaDevices>> {
        None
    }
}
