use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;

pub const DEFAULT_NUM_REVIEWS: u32 = 10;

/// One kind of backend analysis together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operation {
    Keyword(KeywordRequest),
    Category(CategoryRequest),
    Comparison(ComparisonRequest),
    CategoryComparison(CategoryComparisonRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
    pub num_reviews: u32,
    pub log_details: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub cat1: String,
    pub cat2: String,
    pub cat3: String,
    pub num_reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub keyword_a: String,
    pub keyword_b: String,
    pub num_reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryComparisonRequest {
    pub cat1_a: String,
    pub cat2_a: String,
    pub cat3_a: String,
    pub cat1_b: String,
    pub cat2_b: String,
    pub cat3_b: String,
    pub num_reviews: u32,
}

impl Operation {
    pub fn keyword(keyword: impl Into<String>, num_reviews: u32) -> Self {
        Operation::Keyword(KeywordRequest {
            keyword: keyword.into(),
            num_reviews,
            log_details: true,
        })
    }

    pub fn category(
        cat1: impl Into<String>,
        cat2: impl Into<String>,
        cat3: impl Into<String>,
        num_reviews: u32,
    ) -> Self {
        Operation::Category(CategoryRequest {
            cat1: cat1.into(),
            cat2: cat2.into(),
            cat3: cat3.into(),
            num_reviews,
        })
    }

    pub fn comparison(
        keyword_a: impl Into<String>,
        keyword_b: impl Into<String>,
        num_reviews: u32,
    ) -> Self {
        Operation::Comparison(ComparisonRequest {
            keyword_a: keyword_a.into(),
            keyword_b: keyword_b.into(),
            num_reviews,
        })
    }

    pub fn category_comparison(
        a: [&str; 3],
        b: [&str; 3],
        num_reviews: u32,
    ) -> Self {
        Operation::CategoryComparison(CategoryComparisonRequest {
            cat1_a: a[0].to_string(),
            cat2_a: a[1].to_string(),
            cat3_a: a[2].to_string(),
            cat1_b: b[0].to_string(),
            cat2_b: b[1].to_string(),
            cat3_b: b[2].to_string(),
            num_reviews,
        })
    }

    /// Path of the streaming endpoint, relative to the API base URL.
    pub fn stream_endpoint(&self) -> &'static str {
        match self {
            Operation::Keyword(_) => "/api/analyze/keyword/stream",
            Operation::Category(_) => "/api/analyze/category/stream",
            Operation::Comparison(_) => "/api/analyze/comparison/stream",
            Operation::CategoryComparison(_) => "/api/analyze/category-comparison/stream",
        }
    }

    /// JSON request body as sent on the wire.
    pub fn body(&self) -> Value {
        // Plain structs of strings and integers always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Human readable label, also used to name saved results.
    pub fn label(&self) -> String {
        match self {
            Operation::Keyword(req) => format!("{} ({} reviews)", req.keyword, req.num_reviews),
            Operation::Category(req) => format!(
                "{} > {} > {} ({} reviews)",
                req.cat1, req.cat2, req.cat3, req.num_reviews
            ),
            Operation::Comparison(req) => format!(
                "{} vs {} ({} reviews)",
                req.keyword_a, req.keyword_b, req.num_reviews
            ),
            Operation::CategoryComparison(req) => format!(
                "{}/{}/{} vs {}/{}/{} ({} reviews)",
                req.cat1_a, req.cat2_a, req.cat3_a, req.cat1_b, req.cat2_b, req.cat3_b,
                req.num_reviews
            ),
        }
    }
}

/// Typed view of a keyword analysis result.
///
/// Every field is defaulted and read leniently, so partial payloads and the
/// server's placeholder values (`""`, `null`, float counts) still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordAnalysis {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "lenient::text")]
    pub keyword: String,
    #[serde(deserialize_with = "lenient::count")]
    pub total_pos: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_neg: u64,
    #[serde(deserialize_with = "lenient::satisfaction")]
    pub avg_satisfaction: f64,
    #[serde(deserialize_with = "lenient::counts")]
    pub satisfaction_counts: BTreeMap<String, u64>,
    #[serde(deserialize_with = "lenient::text")]
    pub distribution_interpretation: String,
    #[serde(deserialize_with = "lenient::scores")]
    pub all_scores: Vec<f64>,
    #[serde(deserialize_with = "lenient::scores")]
    pub outliers: Vec<f64>,
    /// Complaint summary; the server sends either markdown text or a list.
    #[serde(deserialize_with = "lenient::lines")]
    pub negative_summary: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub url_markdown: String,
}

impl Default for KeywordAnalysis {
    fn default() -> Self {
        Self {
            status: String::new(),
            keyword: String::new(),
            total_pos: 0,
            total_neg: 0,
            avg_satisfaction: lenient::NEUTRAL_SATISFACTION,
            satisfaction_counts: BTreeMap::new(),
            distribution_interpretation: String::new(),
            all_scores: Vec::new(),
            outliers: Vec::new(),
            negative_summary: Vec::new(),
            url_markdown: String::new(),
        }
    }
}

impl KeywordAnalysis {
    /// Share of positive sentences, if any sentence was scored.
    pub fn positive_ratio(&self) -> Option<f64> {
        let total = self.total_pos + self.total_neg;
        (total > 0).then(|| self.total_pos as f64 / total as f64)
    }
}

/// Typed view of a keyword comparison result.
///
/// The streamed comparison carries the raw per-festival results, which have
/// no `keyword` field; [`ComparisonAnalysis::named`] fills it in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonAnalysis {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "lenient::text")]
    pub keyword_a: String,
    #[serde(deserialize_with = "lenient::text")]
    pub keyword_b: String,
    #[serde(deserialize_with = "lenient::object_or_default")]
    pub results_a: KeywordAnalysis,
    #[serde(deserialize_with = "lenient::object_or_default")]
    pub results_b: KeywordAnalysis,
    #[serde(deserialize_with = "lenient::text")]
    pub comparison_summary: String,
}

impl ComparisonAnalysis {
    /// Copies the compared keywords into results that lack their own.
    pub fn named(mut self) -> Self {
        if self.results_a.keyword.is_empty() {
            self.results_a.keyword = self.keyword_a.clone();
        }
        if self.results_b.keyword.is_empty() {
            self.results_b.keyword = self.keyword_b.clone();
        }
        self
    }
}
