use crate::summary::summarize;
use crate::{AppState, Effect, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submit(operation) => {
            if state.phase() == Phase::Running {
                // One analysis at a time; the page keeps its running request.
                return (state, Vec::new());
            }
            let request_id = state.begin(operation.clone());
            vec![Effect::StartAnalysis {
                request_id,
                operation,
            }]
        }
        Msg::Progress { request_id, event } => {
            if state.is_active(request_id) {
                state.apply_progress(&event);
            }
            Vec::new()
        }
        Msg::Completed { request_id, data } => {
            if !state.is_active(request_id) {
                return (state, Vec::new());
            }
            let Some(operation) = state.finish_active() else {
                return (state, Vec::new());
            };
            match summarize(&operation, &data) {
                Ok(summary) => {
                    state.complete(summary);
                    if state.saves_results() {
                        vec![Effect::SaveResult { operation, data }]
                    } else {
                        Vec::new()
                    }
                }
                Err(error) => {
                    state.fail(&error);
                    Vec::new()
                }
            }
        }
        Msg::Failed { request_id, error } => {
            if state.is_active(request_id) {
                state.finish_active();
                state.fail(&error);
            }
            Vec::new()
        }
        Msg::CancelClicked => match state.active_request() {
            Some(request_id) => {
                state.finish_active();
                state.cancel();
                vec![Effect::CancelAnalysis { request_id }]
            }
            None => Vec::new(),
        },
        Msg::Reset => {
            let effects = state
                .active_request()
                .map(|request_id| vec![Effect::CancelAnalysis { request_id }])
                .unwrap_or_default();
            state.reset();
            effects
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
