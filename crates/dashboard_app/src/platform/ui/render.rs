//! Terminal rendering of analyses, lookups and errors.

use std::time::Duration;

use console::style;
use dashboard_core::{AppViewModel, ErrorView, KeywordSummary, Phase, ResultSummary};
use festival_client::{ErrorCategory, FestivalTrend, Recommendation, SeasonalTrends};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}";

/// Owns the progress bar of the running analysis.
pub struct Renderer {
    bar: ProgressBar,
    shown_history: usize,
}

impl Renderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self {
            bar,
            shown_history: 0,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) {
        if let Some(label) = &view.request_label {
            self.bar.set_prefix(label.clone());
        }
        // Earlier steps scroll above the bar so the log of the run stays visible.
        if view.status_history.len() < self.shown_history {
            self.shown_history = 0;
        }
        let finished_steps = view.status_history.len().saturating_sub(1);
        for step in view.status_history[self.shown_history.min(finished_steps)..finished_steps].iter() {
            self.bar.println(format!("  {} {}", style("✓").green(), step));
        }
        self.shown_history = self.shown_history.max(finished_steps);

        self.bar.set_position(u64::from(view.progress_percent));
        self.bar.set_message(view.status_message.clone());
        self.bar.tick();
    }

    /// Clears the bar and prints how the analysis ended.
    pub fn finish(self, view: &AppViewModel) {
        self.bar.finish_and_clear();
        match view.phase {
            Phase::Completed => {
                if let Some(label) = &view.request_label {
                    println!("{} {}", style("✓").green(), style(label).bold());
                }
                if let Some(result) = &view.result {
                    print!("{}", format_result(result));
                }
            }
            Phase::Failed => {
                if let Some(error) = &view.error {
                    eprintln!("{}", format_error(error));
                }
            }
            Phase::Cancelled => eprintln!("{} cancelled", style("!").yellow()),
            Phase::Idle | Phase::Running => {}
        }
    }
}

/// Spinner for lookups with no progress to report.
pub fn waiting_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn format_list(entries: &[String]) -> String {
    entries.iter().map(|entry| format!("{entry}\n")).collect()
}

pub fn format_seasonal(trends: &SeasonalTrends) -> String {
    let mut out = format!("{}\n", style(format!("Top festivals ({})", trends.season)).bold());
    if trends.top_festivals.is_empty() {
        out.push_str("  no trend data\n");
    }
    for festival in &trends.top_festivals {
        let period = match (festival.starts.as_str(), festival.ends.as_str()) {
            ("", "") => String::new(),
            (starts, ends) => format!("  {starts} ~ {ends}"),
        };
        out.push_str(&format!(
            "  {:>2}. {:<24} peak {:>6.1}  mean {:>6.1}{}\n",
            festival.rank, festival.name, festival.peak_search, festival.mean_search, period
        ));
    }
    let links = [
        ("word cloud", &trends.wordcloud_url),
        ("timeline", &trends.timeline_url),
    ];
    for (label, link) in links {
        if !link.is_empty() {
            out.push_str(&format!("  {label}: {link}\n"));
        }
    }
    out
}

pub fn format_festival_trend(trend: &FestivalTrend) -> String {
    format!(
        "{} search trend: {}\n",
        style(&trend.festival_name).bold(),
        trend.trend_graph_url
    )
}

pub fn format_recommendation(recommendation: &Recommendation) -> String {
    let mut out = String::new();
    if !recommendation.region.is_empty() || !recommendation.season.is_empty() {
        out.push_str(&format!(
            "{}\n",
            style(format!(
                "Advice for visitors from {} in {}",
                recommendation.region, recommendation.season
            ))
            .bold()
        ));
    }
    out.push_str(recommendation.recommendation.trim_end());
    out.push('\n');
    out
}

pub fn format_error(error: &ErrorView) -> String {
    let heading = match error.category {
        ErrorCategory::Transport => "could not reach the analysis server",
        ErrorCategory::Protocol => "the server sent something unexpected",
        ErrorCategory::Application => "analysis failed",
        ErrorCategory::Cancelled => "cancelled",
    };
    format!("{} {}: {}", style("✗").red(), heading, error.message)
}

pub fn format_result(result: &ResultSummary) -> String {
    let mut out = String::new();
    match result {
        ResultSummary::Keyword(summary) => write_keyword(&mut out, summary),
        ResultSummary::Comparison { a, b, summary } => {
            write_keyword(&mut out, a);
            out.push('\n');
            write_keyword(&mut out, b);
            if !summary.is_empty() {
                out.push_str(&format!("\n{}\n{}\n", style("Comparison").bold(), summary));
            }
        }
        ResultSummary::Sections { fields } => {
            out.push_str(&format!("{}\n", style("Sections").bold()));
            for field in fields {
                out.push_str(&format!("  - {field}\n"));
            }
        }
    }
    out
}

fn write_keyword(out: &mut String, summary: &KeywordSummary) {
    out.push_str(&format!("{}\n", style(&summary.keyword).bold().underlined()));
    let ratio = summary
        .positive_ratio
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    out.push_str(&format!(
        "  positive {}  negative {}  ({} positive)\n",
        style(summary.total_pos).green(),
        style(summary.total_neg).red(),
        ratio
    ));
    out.push_str(&format!("  average satisfaction {:.2}\n", summary.avg_satisfaction));
    if !summary.interpretation.is_empty() {
        out.push_str(&format!("  {}\n", summary.interpretation));
    }

    if let Some(scores) = &summary.scores {
        out.push_str(&format!(
            "  scores q1 {:.2}  median {:.2}  q3 {:.2}  fences [{:.2}, {:.2}]  outliers {}\n",
            scores.q1,
            scores.median,
            scores.q3,
            scores.lower_bound,
            scores.upper_bound,
            summary.outlier_count
        ));
    }

    let widest = summary.histogram.iter().map(|b| b.count).max().unwrap_or(0);
    if widest > 0 {
        out.push_str("  score distribution\n");
        for bin in &summary.histogram {
            out.push_str(&format!(
                "    {:<26} {:<20} {}\n",
                bin.label,
                bar(bin.count, widest),
                bin.count
            ));
        }
    }

    out.push_str("  satisfaction\n");
    for bucket in &summary.satisfaction {
        out.push_str(&format!("    {:<8} {}\n", bucket.level, bucket.count));
    }

    if !summary.negative_summary.is_empty() {
        out.push_str("  complaints\n");
        for line in &summary.negative_summary {
            out.push_str(&format!("    - {line}\n"));
        }
    }
}

fn bar(count: usize, widest: usize) -> String {
    let width = (count * 20).div_ceil(widest);
    "█".repeat(width)
}
