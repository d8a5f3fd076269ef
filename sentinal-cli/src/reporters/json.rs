//! JSON reporter
//!
//! Outputs the full AnalysisRun as pretty-printed JSON, for piping to jq
//! or feeding another tool.

use crate::models::AnalysisRun;
use anyhow::Result;

pub fn render(run: &AnalysisRun) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_run;

    #[test]
    fn test_json_render_valid() {
        let run = test_run();
        let json_str = render(&run).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["classification"], "CRITICAL");
        assert_eq!(parsed["score"], 80);
        assert_eq!(parsed["report_source"], "fallback");
        assert_eq!(parsed["findings"].as_array().expect("findings array").len(), 2);
        assert_eq!(parsed["dependencies"][0]["kind"], "TABLE_DROP_CONFLICT");
        assert_eq!(parsed["findings_summary"]["critical"], 2);
        assert_eq!(parsed["entities"][0]["artifact"], "a.sql");
        assert_eq!(parsed["entities"][0]["entities"]["tables_dropped"][0], "users");
        assert!(parsed["entities"][0]["entities"].get("resources").is_none());
    }

    #[test]
    fn test_json_omits_artifact_content() {
        let run = test_run();
        let json_str = render(&run).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["artifacts"][0]["name"], "a.sql");
        assert!(parsed["artifacts"][0].get("content").is_none());
    }
}
