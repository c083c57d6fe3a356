use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use client_logging::{client_info, client_warn};
use dashboard_core::{update, AppState, ErrorView, Msg, Phase};
use festival_client::{
    CatalogClient, EngineEvent, EngineHandle, InsightsClient, Operation, RecommendationRequest,
    StreamError, StreamEvent, StreamSettings,
};

use super::effects::EffectRunner;
use super::ui::render::{
    format_error, format_festival_trend, format_list, format_recommendation, format_seasonal,
    waiting_spinner, Renderer,
};
use crate::cli::{Cli, Command};

const TICK: Duration = Duration::from_millis(75);
const EXIT_CANCELLED: u8 = 130;

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = StreamSettings::with_base_url(cli.base_url.clone());
    client_info!("using analysis server at {}", settings.base_url);

    match cli.command {
        Command::Analysis(analysis) => {
            run_analysis(analysis.operation(), settings, cli.save_dir)
        }
        Command::Categories { cat1, cat2, cat3 } => run_lookup(None, async move {
            let catalog = CatalogClient::new(settings)?;
            let entries = match (cat1.as_deref(), cat2.as_deref(), cat3.as_deref()) {
                (Some(c1), Some(c2), Some(c3)) => catalog.festivals(c1, c2, c3).await?,
                (Some(c1), Some(c2), None) => catalog.small_categories(c1, c2).await?,
                (Some(c1), None, _) => catalog.medium_categories(c1).await?,
                (None, _, _) => catalog.categories().await?,
            };
            if entries.is_empty() {
                client_warn!("catalog lookup returned no entries");
            }
            Ok::<_, StreamError>(format_list(&entries))
        }),
        Command::Seasonal { season } => run_lookup(None, async move {
            let trends = InsightsClient::new(settings)?.seasonal_trends(season).await?;
            Ok::<_, StreamError>(format_seasonal(&trends))
        }),
        Command::FestivalTrend {
            festival_name,
            season,
        } => run_lookup(None, async move {
            let trend = InsightsClient::new(settings)?
                .festival_trend(&festival_name, season)
                .await?;
            Ok::<_, StreamError>(format_festival_trend(&trend))
        }),
        Command::Recommend {
            region,
            season,
            target,
        } => {
            let request = RecommendationRequest::new(target.operation(), region, season);
            let waiting = format!("asking for advice on {}", request.operation.label());
            run_lookup(Some(waiting), async move {
                let recommendation = InsightsClient::new(settings)?.recommend(&request).await?;
                Ok::<_, StreamError>(format_recommendation(&recommendation))
            })
        }
    }
}

fn run_analysis(
    operation: Operation,
    settings: StreamSettings,
    save_dir: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let saving = save_dir.is_some();
    let engine = EngineHandle::new(settings).context("failed to start analysis engine")?;
    let runner = EffectRunner::new(engine, save_dir);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    ctrlc::set_handler(move || {
        let _ = msg_tx.send(Msg::CancelClicked);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut renderer = Renderer::new();
    let mut state = AppState::with_saving(saving);
    state = dispatch(state, Msg::Submit(operation), &runner);

    loop {
        while let Ok(msg) = msg_rx.try_recv() {
            state = dispatch(state, msg, &runner);
        }

        let msg = match runner.engine().recv_timeout(TICK) {
            Some(event) => engine_msg(event),
            None => Msg::Tick,
        };
        state = dispatch(state, msg, &runner);

        if state.consume_dirty() {
            renderer.render(&state.view());
        }
        if state.phase() != Phase::Running {
            break;
        }
    }

    let view = state.view();
    renderer.finish(&view);
    Ok(match view.phase {
        Phase::Completed => ExitCode::SUCCESS,
        Phase::Cancelled => ExitCode::from(EXIT_CANCELLED),
        _ => ExitCode::FAILURE,
    })
}

fn dispatch(state: AppState, msg: Msg, runner: &EffectRunner) -> AppState {
    let (state, effects) = update(state, msg);
    runner.run(effects);
    state
}

fn engine_msg(event: EngineEvent) -> Msg {
    let request_id = event.request_id;
    match event.event {
        StreamEvent::Progress(event) => Msg::Progress { request_id, event },
        StreamEvent::Result(data) => Msg::Completed { request_id, data },
        StreamEvent::Failed(error) => Msg::Failed { request_id, error },
    }
}

/// Runs one request/response lookup and prints its rendering, or its error.
/// Slow lookups pass a `waiting` message to show a spinner meanwhile.
fn run_lookup<F>(waiting: Option<String>, lookup: F) -> anyhow::Result<ExitCode>
where
    F: Future<Output = Result<String, StreamError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let spinner = waiting.map(waiting_spinner);
    let outcome = runtime.block_on(lookup);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    match outcome {
        Ok(text) => {
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", format_error(&ErrorView::from(&err)));
            Ok(ExitCode::FAILURE)
        }
    }
}
