//! Command line surface of `festival-dash`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use festival_client::{Operation, Season, DEFAULT_NUM_REVIEWS};

#[derive(Parser, Debug)]
#[command(name = "festival-dash")]
#[command(about = "Festival sentiment analysis dashboard for the terminal")]
#[command(version)]
pub struct Cli {
    /// Base URL of the analysis API
    #[arg(long, global = true, env = "FESTIVAL_API_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Save finished results as JSON into this directory
    #[arg(long, global = true)]
    pub save_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Analysis(AnalysisCommand),

    /// List categories, or festivals once all three levels are given
    Categories {
        cat1: Option<String>,
        cat2: Option<String>,
        cat3: Option<String>,
    },

    /// Most searched festivals of a season
    Seasonal {
        /// spring, summer, autumn, winter (or 봄, 여름, 가을, 겨울)
        season: Season,
    },

    /// Search trend chart of one festival
    FestivalTrend {
        festival_name: String,
        #[arg(long)]
        season: Option<Season>,
    },

    /// AI travel advice based on an analysis
    Recommend {
        /// Where the visitor travels from
        #[arg(long)]
        region: String,
        /// When the visitor plans to go
        #[arg(long)]
        season: Season,
        #[command(subcommand)]
        target: AnalysisCommand,
    },
}

/// Commands that run one backend analysis.
#[derive(Subcommand, Debug)]
pub enum AnalysisCommand {
    /// Analyze reviews of one festival
    Keyword {
        keyword: String,
        /// Number of blog reviews to analyze
        #[arg(short, long, default_value_t = DEFAULT_NUM_REVIEWS)]
        reviews: u32,
    },

    /// Analyze every festival of a category
    Category {
        cat1: String,
        cat2: String,
        cat3: String,
        #[arg(short, long, default_value_t = DEFAULT_NUM_REVIEWS)]
        reviews: u32,
    },

    /// Compare two festivals
    Compare {
        keyword_a: String,
        keyword_b: String,
        #[arg(short, long, default_value_t = DEFAULT_NUM_REVIEWS)]
        reviews: u32,
    },

    /// Compare two categories (three levels each)
    CompareCategories {
        cat1_a: String,
        cat2_a: String,
        cat3_a: String,
        cat1_b: String,
        cat2_b: String,
        cat3_b: String,
        #[arg(short, long, default_value_t = DEFAULT_NUM_REVIEWS)]
        reviews: u32,
    },
}

impl AnalysisCommand {
    pub fn operation(&self) -> Operation {
        match self {
            AnalysisCommand::Keyword { keyword, reviews } => Operation::keyword(keyword, *reviews),
            AnalysisCommand::Category {
                cat1,
                cat2,
                cat3,
                reviews,
            } => Operation::category(cat1, cat2, cat3, *reviews),
            AnalysisCommand::Compare {
                keyword_a,
                keyword_b,
                reviews,
            } => Operation::comparison(keyword_a, keyword_b, *reviews),
            AnalysisCommand::CompareCategories {
                cat1_a,
                cat2_a,
                cat3_a,
                cat1_b,
                cat2_b,
                cat3_b,
                reviews,
            } => Operation::category_comparison(
                [cat1_a.as_str(), cat2_a.as_str(), cat3_a.as_str()],
                [cat1_b.as_str(), cat2_b.as_str(), cat3_b.as_str()],
                *reviews,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(cli: &Cli) -> Option<Operation> {
        match &cli.command {
            Command::Analysis(analysis) => Some(analysis.operation()),
            _ => None,
        }
    }

    #[test]
    fn keyword_command_builds_operation() {
        let cli = Cli::try_parse_from(["festival-dash", "keyword", "진해군항제", "-r", "25"]).unwrap();
        assert_eq!(
            operation(&cli),
            Some(Operation::keyword("진해군항제", 25))
        );
    }

    #[test]
    fn compare_categories_takes_two_triples() {
        let cli = Cli::try_parse_from([
            "festival-dash",
            "compare-categories",
            "a1",
            "a2",
            "a3",
            "b1",
            "b2",
            "b3",
        ])
        .unwrap();
        assert_eq!(
            operation(&cli),
            Some(Operation::category_comparison(
                ["a1", "a2", "a3"],
                ["b1", "b2", "b3"],
                DEFAULT_NUM_REVIEWS
            ))
        );
    }

    #[test]
    fn categories_is_not_an_analysis() {
        let cli = Cli::try_parse_from(["festival-dash", "categories", "문화관광"]).unwrap();
        assert_eq!(operation(&cli), None);
    }

    #[test]
    fn verbosity_counts_flags() {
        let cli = Cli::try_parse_from(["festival-dash", "-vv", "keyword", "x"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn recommend_wraps_an_analysis_target() {
        let cli = Cli::try_parse_from([
            "festival-dash",
            "recommend",
            "--region",
            "서울",
            "--season",
            "autumn",
            "compare",
            "A축제",
            "B축제",
        ])
        .unwrap();
        match cli.command {
            Command::Recommend {
                region,
                season,
                target,
            } => {
                assert_eq!(region, "서울");
                assert_eq!(season, Season::Autumn);
                assert_eq!(
                    target.operation(),
                    Operation::comparison("A축제", "B축제", DEFAULT_NUM_REVIEWS)
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
        let recommend = Cli::try_parse_from([
            "festival-dash",
            "recommend",
            "--region",
            "x",
            "--season",
            "봄",
            "keyword",
            "y",
        ])
        .unwrap();
        assert_eq!(operation(&recommend), None);
    }

    #[test]
    fn seasonal_rejects_unknown_season() {
        assert!(Cli::try_parse_from(["festival-dash", "seasonal", "monsoon"]).is_err());
        let cli = Cli::try_parse_from(["festival-dash", "seasonal", "여름"]).unwrap();
        assert!(matches!(cli.command, Command::Seasonal { season: Season::Summer }));
    }
}
