//! Seasonal search trends and AI recommendations.
//!
//! Neither is streamed: the server answers each call with one JSON document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::JsonApi;
use crate::{lenient, Operation, StreamError, StreamSettings};

/// Season as named by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "봄")]
    Spring,
    #[serde(rename = "여름")]
    Summer,
    #[serde(rename = "가을")]
    Autumn,
    #[serde(rename = "겨울")]
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "봄",
            Season::Summer => "여름",
            Season::Autumn => "가을",
            Season::Winter => "겨울",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown season {0:?} (expected spring, summer, autumn, winter or 봄, 여름, 가을, 겨울)")]
pub struct UnknownSeason(pub String);

impl FromStr for Season {
    type Err = UnknownSeason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let wanted = if wanted == "fall" { "autumn".to_string() } else { wanted };
        Season::ALL
            .into_iter()
            .find(|season| season.as_str() == wanted || season.english() == wanted)
            .ok_or_else(|| UnknownSeason(s.to_string()))
    }
}

/// One row of the seasonal top-festival table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingFestival {
    #[serde(rename = "순위", deserialize_with = "lenient::count")]
    pub rank: u64,
    #[serde(rename = "축제명", deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "최대 검색량", deserialize_with = "lenient::number")]
    pub peak_search: f64,
    #[serde(rename = "평균 검색량", deserialize_with = "lenient::number")]
    pub mean_search: f64,
    #[serde(rename = "행사 시작일", deserialize_with = "lenient::text")]
    pub starts: String,
    #[serde(rename = "행사 종료일", deserialize_with = "lenient::text")]
    pub ends: String,
}

/// Popular festivals of a season, with links to the rendered charts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalTrends {
    #[serde(deserialize_with = "lenient::text")]
    pub season: String,
    #[serde(deserialize_with = "lenient::text")]
    pub wordcloud_url: String,
    #[serde(deserialize_with = "lenient::text")]
    pub timeline_url: String,
    #[serde(deserialize_with = "lenient::object_list")]
    pub top_festivals: Vec<TrendingFestival>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub festival_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FestivalTrend {
    #[serde(deserialize_with = "lenient::text")]
    pub festival_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub trend_graph_url: String,
}

/// Asks for advice on an analysis, tailored to where and when the user travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub operation: Operation,
    pub region: String,
    pub season: Season,
}

impl RecommendationRequest {
    pub fn new(operation: Operation, region: impl Into<String>, season: Season) -> Self {
        Self {
            operation,
            region: region.into(),
            season,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self.operation {
            Operation::Keyword(_) => "/api/recommend/single",
            Operation::Category(_) => "/api/recommend/category",
            Operation::Comparison(_) => "/api/recommend/comparison",
            Operation::CategoryComparison(_) => "/api/recommend/category-comparison",
        }
    }

    /// Analysis parameters plus `region` and `season`.
    pub fn body(&self) -> Value {
        let mut body = self.operation.body();
        if let Value::Object(fields) = &mut body {
            fields.remove("log_details");
            fields.insert("region".to_string(), Value::String(self.region.clone()));
            fields.insert(
                "season".to_string(),
                Value::String(self.season.as_str().to_string()),
            );
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "lenient::text")]
    pub region: String,
    #[serde(deserialize_with = "lenient::text")]
    pub season: String,
    /// Markdown.
    #[serde(deserialize_with = "lenient::text")]
    pub recommendation: String,
}

#[derive(Debug, Clone)]
pub struct InsightsClient {
    api: JsonApi,
}

impl InsightsClient {
    pub fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        Ok(Self {
            api: JsonApi::new(settings)?,
        })
    }

    /// Chart URLs in the response are made absolute against the base URL.
    pub async fn seasonal_trends(&self, season: Season) -> Result<SeasonalTrends, StreamError> {
        let mut trends: SeasonalTrends = self
            .api
            .get("/api/seasonal/analyze", &[("season", season.as_str())])
            .await?;
        trends.wordcloud_url = self.absolute(&trends.wordcloud_url);
        trends.timeline_url = self.absolute(&trends.timeline_url);
        Ok(trends)
    }

    /// `season` only picks the chart colour.
    pub async fn festival_trend(
        &self,
        festival_name: &str,
        season: Option<Season>,
    ) -> Result<FestivalTrend, StreamError> {
        let mut query = vec![("festival_name", festival_name)];
        if let Some(season) = season {
            query.push(("season", season.as_str()));
        }
        let mut trend: FestivalTrend = self.api.get("/api/seasonal/festival-trend", &query).await?;
        trend.trend_graph_url = self.absolute(&trend.trend_graph_url);
        Ok(trend)
    }

    /// Runs (or reuses) the analysis on the server, so this can take minutes.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, StreamError> {
        self.api.post(request.endpoint(), &request.body()).await
    }

    fn absolute(&self, link: &str) -> String {
        if link.is_empty() || link.contains("://") {
            return link.to_string();
        }
        format!(
            "{}/{}",
            self.api.settings().base_url.trim_end_matches('/'),
            link.trim_start_matches('/')
        )
    }
}
