//! Tool definitions for the research agents.
//!
//! This module defines the Sectors tools the LLM can call, and the
//! executor that scopes each agent to the tools it declared.

use crate::error::{Result, ScoutError};
use crate::models::{Market, Ticker};
use crate::sectors::{company_overview_url, top_companies_url, Fetcher};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool definition for the chat completions tool-calling API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text sent back to the model as the tool message content.
    pub fn to_message_content(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("Error: {}", self.error.clone().unwrap_or_default())
        }
    }
}

/// The tools an agent can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CompanyOverview,
    TopCompaniesRanked,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CompanyOverview => "get_company_overview",
            ToolKind::TopCompaniesRanked => "get_top_companies_ranked",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_company_overview" => Some(ToolKind::CompanyOverview),
            "get_top_companies_ranked" => Some(ToolKind::TopCompaniesRanked),
            _ => None,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolKind::CompanyOverview => {
                let markets: Vec<String> = Market::ALL.iter().map(|m| m.to_string()).collect();
                ToolDefinition {
                    tool_type: "function".to_string(),
                    function: FunctionDefinition {
                        name: self.name().to_string(),
                        description: format!(
                            "Get company overview from Indonesia Exchange (IDX), Singapore Exchange (SGX) or Bursa Malaysia (KLSE). Supported countries: {}.",
                            markets.join(", ")
                        ),
                        parameters: json!({
                            "type": "object",
                            "properties": {
                                "ticker": {
                                    "type": "string",
                                    "description": "Stock symbol of the company, e.g. BBCA"
                                },
                                "country": {
                                    "type": "string",
                                    "enum": Market::ALL.map(|m| m.as_str()),
                                    "description": "Market the company is listed on"
                                }
                            },
                            "required": ["ticker", "country"]
                        }),
                    },
                }
            }
            ToolKind::TopCompaniesRanked => ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: self.name().to_string(),
                    description: "Return a list of top companies (symbol) based on certain dimension (dividend yield, total dividend, revenue, earnings, market_cap, PB ratio, PE ratio, or PS ratio).".to_string(),
                    parameters: json!({
                        "type": "object",
                        "properties": {
                            "dimension": {
                                "type": "string",
                                "description": "Ranking dimension, e.g. revenue, market_cap, dividend_yield"
                            }
                        },
                        "required": ["dimension"]
                    }),
                },
            },
        }
    }
}

/// The Sectors-backed tool implementations.
pub struct SectorsTools {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    top_n: usize,
}

impl SectorsTools {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>, top_n: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            top_n,
        }
    }

    /// Fetch the company report for `ticker` on `country`.
    ///
    /// The country is validated before any request is made. Fetch failures
    /// are logged and turned into `None`.
    pub async fn get_company_overview(&self, ticker: &str, country: &str) -> Result<Option<Value>> {
        let market: Market = country.parse()?;
        let url = company_overview_url(&self.base_url, ticker, market);

        match self.fetcher.fetch(&url).await {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                warn!("Error occurred fetching overview for {}: {}", ticker, e);
                Ok(None)
            }
        }
    }

    /// Fetch the top companies for `dimension`. Fetch failures propagate.
    pub async fn get_top_companies_ranked(&self, dimension: &str) -> Result<Vec<Ticker>> {
        let url = top_companies_url(&self.base_url, dimension, self.top_n);
        let payload = self.fetcher.fetch(&url).await?;

        let symbols = extract_symbols(&payload);
        if symbols.is_empty() {
            return Err(ScoutError::ShapeMismatch(format!(
                "no symbols in top companies response for '{}'",
                dimension
            )));
        }
        Ok(symbols)
    }
}

/// Collect ticker symbols from a top-companies payload.
///
/// Accepts a plain array of strings, an array of objects with a `symbol`
/// field, or an object mapping classifications to either of those.
pub fn extract_symbols(payload: &Value) -> Vec<Ticker> {
    let mut symbols = Vec::new();
    collect_symbols(payload, &mut symbols);
    symbols
}

fn collect_symbols(value: &Value, out: &mut Vec<Ticker>) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    Value::Object(obj) => {
                        if let Some(symbol) = obj.get("symbol").and_then(|v| v.as_str()) {
                            out.push(symbol.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(obj) => {
            for nested in obj.values() {
                if nested.is_array() {
                    collect_symbols(nested, out);
                }
            }
        }
        _ => {}
    }
}

/// Executes tool calls for one agent, limited to the tools it declared.
pub struct ToolExecutor {
    tools: Arc<SectorsTools>,
    allowed: Vec<ToolKind>,
}

impl ToolExecutor {
    pub fn new(tools: Arc<SectorsTools>, allowed: Vec<ToolKind>) -> Self {
        Self { tools, allowed }
    }

    /// Definitions for the tools this executor will run.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.allowed.iter().map(ToolKind::definition).collect()
    }

    /// Execute a tool call.
    ///
    /// Unknown or undeclared tools and recoverable tool errors become an
    /// error `ToolResult` for the model. Fatal errors are returned as `Err`.
    pub async fn execute(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {}", name, args);

        let kind = match ToolKind::from_name(name) {
            Some(kind) if self.allowed.contains(&kind) => kind,
            Some(_) => {
                warn!("Model requested tool outside its toolset: {}", name);
                return Ok(ToolResult::error(format!("Tool not available: {}", name)));
            }
            None => return Ok(ToolResult::error(format!("Unknown tool: {}", name))),
        };

        let outcome = match kind {
            ToolKind::CompanyOverview => self.company_overview(args).await,
            ToolKind::TopCompaniesRanked => self.top_companies(args).await,
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }

    async fn company_overview(&self, args: &Value) -> Result<ToolResult> {
        let ticker = required_str(args, "ticker")?;
        let country = required_str(args, "country")?;

        let report = self.tools.get_company_overview(ticker, country).await?;
        Ok(ToolResult::success(
            report.map(|r| r.to_string()).unwrap_or_else(|| "null".to_string()),
        ))
    }

    async fn top_companies(&self, args: &Value) -> Result<ToolResult> {
        let dimension = required_str(args, "dimension")?;

        let tickers = self.tools.get_top_companies_ranked(dimension).await?;
        Ok(ToolResult::success(serde_json::to_string(&tickers)?))
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScoutError::Agent(format!("Missing required parameter: {}", key)))
}
