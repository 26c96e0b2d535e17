//! Two-stage research flow.
//!
//! Ranks companies from the operator's criteria, then researches each
//! ticker. Ranking failures abort the run; research failures are recorded
//! per ticker and never stop the remaining ones.

use crate::agent::{AgentSpec, TaskExecutor};
use crate::error::{Result, ScoutError};
use crate::models::{RunReport, Ticker, TickerOutcome, TickerStatus};
use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Orchestrates the ranking agent and the research agent.
pub struct ResearchFlow {
    executor: Arc<dyn TaskExecutor>,
    ranking: AgentSpec,
    research: AgentSpec,
    model_name: String,
    parallel: bool,
    show_progress: bool,
}

impl ResearchFlow {
    pub fn new(executor: Arc<dyn TaskExecutor>, model_name: impl Into<String>) -> Self {
        Self {
            executor,
            ranking: AgentSpec::ranking(),
            research: AgentSpec::research(),
            model_name: model_name.into(),
            parallel: false,
            show_progress: false,
        }
    }

    /// Research all tickers concurrently.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Show a spinner on stderr while agents are running.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the whole flow, writing operator-facing lines to `out`.
    pub async fn run<W: Write>(&self, prompt: &str, out: &mut W) -> Result<RunReport> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ScoutError::InvalidArgument(
                "screening criteria must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let span = info_span!("research_flow", parallel = self.parallel);

        async {
            let tickers = self.rank(prompt, out).await?;

            let outcomes = if self.parallel {
                self.research_concurrently(&tickers, out).await?
            } else {
                self.research_sequentially(&tickers, out).await?
            };

            Ok::<RunReport, ScoutError>(RunReport {
                prompt: prompt.to_string(),
                tickers,
                outcomes,
                model: self.model_name.clone(),
                generated_at: Utc::now(),
                duration_seconds: start.elapsed().as_secs_f64(),
            })
        }
        .instrument(span)
        .await
    }

    /// Run the ranking agent and validate that it produced a list of tickers.
    pub async fn rank<W: Write>(&self, prompt: &str, out: &mut W) -> Result<Vec<Ticker>> {
        let spinner = self.spinner("Ranking companies...");
        let output = self.executor.execute(&self.ranking, prompt).await;
        spinner.finish_and_clear();

        let output = output?;
        debug!("Ranking agent used {} tool calls", output.tool_calls);
        writeln!(out, "🤖 step 1 : {}", output.final_output)?;

        let tickers = expect_ticker_list(&output.final_output)?;
        if tickers.is_empty() {
            warn!("Ranking agent returned no tickers");
        }
        info!("Ranked {} tickers", tickers.len());

        Ok(tickers)
    }

    /// Research a single ticker. Never fails; failures become `Skipped`.
    pub async fn research_one(&self, ticker: &str) -> TickerOutcome {
        match self.executor.execute(&self.research, ticker).await {
            Ok(output) => match summary_text(&output.final_output) {
                Some(summary) => TickerOutcome::researched(ticker, summary),
                None => {
                    warn!("Research agent returned an empty result for {}", ticker);
                    TickerOutcome::skipped(ticker, "empty result")
                }
            },
            Err(e) => {
                warn!("Research failed for {}: {}", ticker, e);
                TickerOutcome::skipped(ticker, e.to_string())
            }
        }
    }

    async fn research_sequentially<W: Write>(
        &self,
        tickers: &[Ticker],
        out: &mut W,
    ) -> Result<Vec<TickerOutcome>> {
        let mut outcomes = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            writeln!(out, "🤖: Getting information for this company: {}", ticker)?;

            let spinner = self.spinner(&format!("Researching {}...", ticker));
            let outcome = self.research_one(ticker).await;
            spinner.finish_and_clear();

            write_outcome(out, &outcome)?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn research_concurrently<W: Write>(
        &self,
        tickers: &[Ticker],
        out: &mut W,
    ) -> Result<Vec<TickerOutcome>> {
        for ticker in tickers {
            writeln!(out, "🤖: Getting information for this company: {}", ticker)?;
        }

        let spinner = self.spinner(&format!("Researching {} companies...", tickers.len()));
        let outcomes = join_all(tickers.iter().map(|t| self.research_one(t))).await;
        spinner.finish_and_clear();

        for outcome in &outcomes {
            write_outcome(out, outcome)?;
        }

        Ok(outcomes)
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Accept only a JSON array whose elements are all strings.
pub fn expect_ticker_list(value: &Value) -> Result<Vec<Ticker>> {
    let items = value
        .as_array()
        .ok_or_else(|| ScoutError::ShapeMismatch(format!("Invalid tickers: {}", value)))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ScoutError::ShapeMismatch(format!("Invalid ticker: {}", item)))
        })
        .collect()
}

fn summary_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn write_outcome<W: Write>(out: &mut W, outcome: &TickerOutcome) -> Result<()> {
    match &outcome.status {
        TickerStatus::Researched { summary } => writeln!(out, "🤖 Final Result: {}", summary)?,
        TickerStatus::Skipped { .. } => writeln!(
            out,
            "🤖: Failed to get data for this company: {}",
            outcome.ticker
        )?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::agent_loop::AgentOutput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Research {
        Summary(&'static str, u64),
        Empty,
        Fail,
    }

    /// Executor double: fixed ranking output, per-ticker research behaviour.
    struct FakeExecutor {
        ranking: Value,
        research: HashMap<String, Research>,
        research_calls: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        fn new(ranking: Value, research: &[(&str, Research)]) -> Self {
            Self {
                ranking,
                research: research
                    .iter()
                    .map(|(t, r)| (t.to_string(), r.clone()))
                    .collect(),
                research_calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.research_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskExecutor for FakeExecutor {
        async fn execute(&self, agent: &AgentSpec, input: &str) -> Result<AgentOutput> {
            if agent.name == AgentSpec::ranking().name {
                return Ok(AgentOutput {
                    final_output: self.ranking.clone(),
                    tool_calls: 1,
                });
            }

            self.research_calls.lock().unwrap().push(input.to_string());
            match self.research.get(input) {
                Some(Research::Summary(text, delay_ms)) => {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                    Ok(AgentOutput {
                        final_output: json!(text),
                        tool_calls: 1,
                    })
                }
                Some(Research::Empty) => Ok(AgentOutput {
                    final_output: json!(""),
                    tool_calls: 1,
                }),
                Some(Research::Fail) | None => Err(ScoutError::Llm("API error 500".to_string())),
            }
        }
    }

    fn flow(executor: Arc<FakeExecutor>) -> ResearchFlow {
        ResearchFlow::new(executor, "test-model")
    }

    #[tokio::test]
    async fn test_researches_each_ticker_in_order() {
        let executor = Arc::new(FakeExecutor::new(
            json!(["AAA", "BBB", "CCC"]),
            &[
                ("AAA", Research::Summary("alpha", 0)),
                ("BBB", Research::Summary("beta", 0)),
                ("CCC", Research::Summary("gamma", 0)),
            ],
        ));
        let mut out = Vec::new();

        let report = flow(executor.clone()).run("top revenue", &mut out).await.unwrap();

        assert_eq!(executor.calls(), vec!["AAA", "BBB", "CCC"]);
        assert_eq!(report.tickers, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(report.researched_count(), 3);
        assert_eq!(report.model, "test-model");

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "🤖 step 1 : [\"AAA\",\"BBB\",\"CCC\"]");
        assert_eq!(lines[1], "🤖: Getting information for this company: AAA");
        assert_eq!(lines[2], "🤖 Final Result: alpha");
        assert_eq!(lines[6], "🤖 Final Result: gamma");
    }

    #[tokio::test]
    async fn test_empty_result_is_skipped_and_loop_continues() {
        let executor = Arc::new(FakeExecutor::new(
            json!(["AAA", "BBB", "CCC"]),
            &[
                ("AAA", Research::Summary("alpha", 0)),
                ("BBB", Research::Empty),
                ("CCC", Research::Summary("gamma", 0)),
            ],
        ));
        let mut out = Vec::new();

        let report = flow(executor.clone()).run("top revenue", &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("🤖: Failed to get data for this company: BBB"));
        assert!(text.contains("🤖 Final Result: alpha"));
        assert!(text.contains("🤖 Final Result: gamma"));
        assert_eq!(report.researched_count(), 2);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.outcomes[1], TickerOutcome::skipped("BBB", "empty result"));
    }

    #[tokio::test]
    async fn test_research_error_is_recorded_per_ticker() {
        let executor = Arc::new(FakeExecutor::new(
            json!(["AAA", "BBB"]),
            &[("AAA", Research::Fail), ("BBB", Research::Summary("beta", 0))],
        ));
        let mut out = Vec::new();

        let report = flow(executor.clone()).run("top revenue", &mut out).await.unwrap();

        assert_eq!(executor.calls(), vec!["AAA", "BBB"]);
        assert!(!report.outcomes[0].is_researched());
        assert!(report.outcomes[1].is_researched());
    }

    #[tokio::test]
    async fn test_non_list_ranking_fails_fast() {
        let executor = Arc::new(FakeExecutor::new(json!("AAA, BBB and CCC"), &[]));
        let mut out = Vec::new();

        let result = flow(executor.clone()).run("top revenue", &mut out).await;

        assert!(matches!(result, Err(ScoutError::ShapeMismatch(_))));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_with_non_string_fails_fast() {
        let executor = Arc::new(FakeExecutor::new(json!(["AAA", 42]), &[]));
        let mut out = Vec::new();

        let result = flow(executor.clone()).run("top revenue", &mut out).await;

        assert!(matches!(result, Err(ScoutError::ShapeMismatch(_))));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let executor = Arc::new(FakeExecutor::new(json!(["AAA"]), &[]));
        let mut out = Vec::new();

        let result = flow(executor).run("   ", &mut out).await;

        assert!(matches!(result, Err(ScoutError::InvalidArgument(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_keeps_ticker_order() {
        let executor = Arc::new(FakeExecutor::new(
            json!(["AAA", "BBB", "CCC"]),
            &[
                ("AAA", Research::Summary("alpha", 60)),
                ("BBB", Research::Summary("beta", 30)),
                ("CCC", Research::Summary("gamma", 0)),
            ],
        ));
        let mut out = Vec::new();

        let report = flow(executor.clone())
            .parallel(true)
            .run("top revenue", &mut out)
            .await
            .unwrap();

        let order: Vec<&str> = report.outcomes.iter().map(|o| o.ticker.as_str()).collect();
        assert_eq!(order, ["AAA", "BBB", "CCC"]);
        assert_eq!(executor.calls().len(), 3);

        let text = String::from_utf8(out).unwrap();
        let alpha = text.find("Final Result: alpha").unwrap();
        let gamma = text.find("Final Result: gamma").unwrap();
        assert!(alpha < gamma);
        assert_eq!(text.matches("Final Result").count(), 3);
    }

    #[test]
    fn test_expect_ticker_list() {
        assert_eq!(
            expect_ticker_list(&json!([" AAA ", "BBB"])).unwrap(),
            vec!["AAA", "BBB"]
        );
        assert!(expect_ticker_list(&json!({"tickers": ["AAA"]})).is_err());
        assert!(expect_ticker_list(&Value::Null).is_err());
    }

    #[tokio::test]
    async fn test_blank_ticker_fails_fast() {
        let executor = Arc::new(FakeExecutor::new(json!(["", "AAA"]), &[]));
        let mut out = Vec::new();

        let result = flow(executor.clone()).run("top revenue", &mut out).await;

        assert!(matches!(result, Err(ScoutError::ShapeMismatch(_))));
        assert!(executor.calls().is_empty());
        assert!(expect_ticker_list(&json!(["AAA", "  "])).is_err());
    }
}
