use std::path::PathBuf;

use dashboard_core::Effect;
use festival_client::EngineHandle;
use client_logging::{client_debug, client_error, client_warn};

use super::persistence;

/// Carries out what `update` asked for.
pub struct EffectRunner {
    engine: EngineHandle,
    save_dir: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, save_dir: Option<PathBuf>) -> Self {
        Self { engine, save_dir }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartAnalysis {
                    request_id,
                    operation,
                } => {
                    client_debug!("StartAnalysis request_id={} {}", request_id, operation.label());
                    self.engine.start(request_id, operation);
                }
                Effect::CancelAnalysis { request_id } => {
                    client_debug!("CancelAnalysis request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
                Effect::SaveResult { operation, data } => {
                    let Some(dir) = self.save_dir.as_deref() else {
                        client_warn!("result save requested without a save directory");
                        continue;
                    };
                    match persistence::save_result(dir, &operation, &data) {
                        Ok(path) => eprintln!("saved {}", path.display()),
                        Err(err) => client_error!("failed to save result of {}: {}", operation.label(), err),
                    }
                }
            }
        }
    }
}
