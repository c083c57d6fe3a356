use festival_client::{
    decode_result, ComparisonAnalysis, KeywordAnalysis, Operation, StreamError,
};
use serde_json::Value;

use crate::stats::{self, BoxSummary, SatisfactionBucket, ScoreBin};

/// What the result page shows for a finished analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSummary {
    Keyword(KeywordSummary),
    Comparison {
        a: KeywordSummary,
        b: KeywordSummary,
        summary: String,
    },
    /// Category analyses carry free-form tables; only their sections are listed.
    Sections { fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSummary {
    pub keyword: String,
    pub total_pos: u64,
    pub total_neg: u64,
    pub positive_ratio: Option<f64>,
    pub avg_satisfaction: f64,
    pub interpretation: String,
    pub scores: Option<BoxSummary>,
    pub outlier_count: usize,
    pub histogram: [ScoreBin; 6],
    pub satisfaction: [SatisfactionBucket; 5],
    pub negative_summary: Vec<String>,
}

impl From<&KeywordAnalysis> for KeywordSummary {
    fn from(analysis: &KeywordAnalysis) -> Self {
        let scores = stats::box_summary(&analysis.all_scores);
        let outlier_count = stats::outliers(&analysis.all_scores).len();
        Self {
            keyword: analysis.keyword.clone(),
            total_pos: analysis.total_pos,
            total_neg: analysis.total_neg,
            positive_ratio: analysis.positive_ratio(),
            avg_satisfaction: analysis.avg_satisfaction,
            interpretation: analysis.distribution_interpretation.clone(),
            scores,
            outlier_count,
            histogram: stats::score_histogram(&analysis.all_scores),
            satisfaction: stats::satisfaction_buckets(&analysis.satisfaction_counts),
            negative_summary: analysis.negative_summary.clone(),
        }
    }
}

/// Validates a result payload against the shape its operation promises.
pub fn summarize(operation: &Operation, data: &Value) -> Result<ResultSummary, StreamError> {
    match operation {
        Operation::Keyword(_) => {
            let analysis: KeywordAnalysis = decode_result(data.clone())?;
            Ok(ResultSummary::Keyword(KeywordSummary::from(&analysis)))
        }
        Operation::Comparison(_) => {
            let comparison = decode_result::<ComparisonAnalysis>(data.clone())?.named();
            Ok(ResultSummary::Comparison {
                a: KeywordSummary::from(&comparison.results_a),
                b: KeywordSummary::from(&comparison.results_b),
                summary: comparison.comparison_summary,
            })
        }
        Operation::Category(_) | Operation::CategoryComparison(_) => {
            let object: serde_json::Map<String, Value> = decode_result(data.clone())?;
            Ok(ResultSummary::Sections {
                fields: object.keys().cloned().collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festival_client::FailureKind;
    use serde_json::json;

    #[test]
    fn keyword_result_is_summarized() {
        let data = json!({
            "keyword": "강릉커피축제",
            "total_pos": 6,
            "total_neg": 2,
            "avg_satisfaction": 3.8,
            "satisfaction_counts": {"만족": 3, "보통": 1},
            "all_scores": [0.5, 1.0, 1.5, 2.0, 9.0],
        });
        let summary = summarize(&Operation::keyword("강릉커피축제", 10), &data).unwrap();
        let ResultSummary::Keyword(keyword) = summary else {
            panic!("expected keyword summary");
        };
        assert_eq!(keyword.keyword, "강릉커피축제");
        assert_eq!(keyword.positive_ratio, Some(0.75));
        assert_eq!(keyword.outlier_count, 1);
        assert_eq!(keyword.satisfaction[2].count, 1);
        assert_eq!(keyword.satisfaction[3].count, 3);
        assert_eq!(keyword.histogram[5].count, 2);
    }

    #[test]
    fn category_result_lists_sections() {
        let data = json!({"overall_summary": [], "individual_results": []});
        let summary = summarize(&Operation::category("a", "b", "c", 5), &data).unwrap();
        assert_eq!(
            summary,
            ResultSummary::Sections {
                fields: vec!["individual_results".to_string(), "overall_summary".to_string()]
            }
        );
    }

    #[test]
    fn wrong_shape_is_a_protocol_error() {
        let err = summarize(&Operation::keyword("x", 10), &json!([1, 2])).unwrap_err();
        assert_eq!(err.kind, FailureKind::Protocol);
    }

    #[test]
    fn streamed_comparison_is_summarized_with_names() {
        let data = json!({
            "status": "비교 분석 완료",
            "keyword_a": "A축제",
            "keyword_b": "B축제",
            "results_a": {"total_pos": 2, "total_neg": 2, "negative_summary": "", "all_scores": [0.5]},
            "results_b": {"total_pos": 1, "total_neg": 0, "trend_graph": null},
            "comparison_summary": "둘 다 무난합니다."
        });
        let summary = summarize(&Operation::comparison("A축제", "B축제", 10), &data).unwrap();
        let ResultSummary::Comparison { a, b, summary } = summary else {
            panic!("expected comparison summary");
        };
        assert_eq!(a.keyword, "A축제");
        assert_eq!(a.positive_ratio, Some(0.5));
        assert!(a.negative_summary.is_empty());
        assert_eq!(b.keyword, "B축제");
        assert_eq!(summary, "둘 다 무난합니다.");
    }
}
