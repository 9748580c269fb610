use crate::config::{LlmSettings, RISK_FREE_RATE};
use crate::session::Session;
use crate::stats;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// How many asset pairs are reported, highest correlation first.
const TOP_PAIRS: usize = 3;

const SYSTEM_PROMPT: &str = "You are a portfolio analyst. You receive a JSON summary of a \
long-only portfolio built from monthly returns. Write a short, plain-language commentary \
(at most 150 words) on diversification, concentration and risk-adjusted return. \
Mention data-quality caveats when history is short or synthetic. Do not give investment advice.";

// ──────────────────────────────────────────────────────────────────────────────
// Fact Payload
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetWeightFact {
    pub ticker: String,
    pub name: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationFact {
    pub ticker: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFact {
    pub a: String,
    pub b: String,
    pub correlation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQualityFact {
    pub ticker: String,
    pub points: usize,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityFact {
    pub aligned_points: usize,
    pub assets: Vec<AssetQualityFact>,
}

/// Everything the commentary provider is told about the portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryFacts {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe: f64,
    pub risk_free_rate: f64,
    pub assets: Vec<AssetWeightFact>,
    pub concentration: Option<ConcentrationFact>,
    pub top_correlations: Vec<PairFact>,
    pub note: String,
    pub data_quality: DataQualityFact,
}

impl CommentaryFacts {
    /// Builds the payload from a session whose snapshot is up to date.
    pub fn from_session(session: &Session, note: &str) -> Self {
        let snapshot = session.snapshot();
        let assets = session.assets();
        let weights = session.weights();

        let concentration = assets
            .iter()
            .zip(weights.iter())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(slot, &w)| ConcentrationFact {
                ticker: slot.ticker.clone(),
                weight: w,
            });

        let top_correlations =
            stats::top_correlated_pairs(&snapshot.statistics.correlation, TOP_PAIRS)
                .into_iter()
                .filter_map(|p| {
                    Some(PairFact {
                        a: assets.get(p.first)?.ticker.clone(),
                        b: assets.get(p.second)?.ticker.clone(),
                        correlation: p.correlation,
                    })
                })
                .collect();

        Self {
            annual_return: snapshot.metrics.annual_return,
            annual_volatility: snapshot.metrics.annual_vol,
            sharpe: snapshot.metrics.sharpe,
            risk_free_rate: RISK_FREE_RATE,
            assets: assets
                .iter()
                .zip(weights.iter())
                .map(|(slot, &w)| AssetWeightFact {
                    ticker: slot.ticker.clone(),
                    name: slot.name.clone(),
                    weight: w,
                })
                .collect(),
            concentration,
            top_correlations,
            note: note.to_string(),
            data_quality: DataQualityFact {
                aligned_points: snapshot.aligned_len,
                assets: assets
                    .iter()
                    .map(|slot| AssetQualityFact {
                        ticker: slot.ticker.clone(),
                        points: slot.series().len(),
                        source: slot.source().as_str().to_string(),
                        filename: slot.filename().map(str::to_string),
                    })
                    .collect(),
            },
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Provider Client
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CommentaryError {
    #[error("commentary provider is not configured (set PORTFOLIO_LAB_LLM_API_KEY)")]
    MissingCredential,

    #[error("commentary provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("commentary request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode commentary facts: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("commentary provider returned no text")]
    EmptyResponse,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Forwards portfolio facts to a chat-completions endpoint. One request per call, no retries.
#[derive(Clone, Debug)]
pub struct CommentaryClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl CommentaryClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Builds the chat-completions POST for `facts`. No timeout is attached.
    fn build_request(&self, facts: &CommentaryFacts) -> Result<reqwest::Request, CommentaryError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(CommentaryError::MissingCredential)?;

        let facts_json = serde_json::to_string_pretty(facts)?;
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &facts_json,
                },
            ],
            temperature: 0.4,
        };

        Ok(self
            .http
            .post(&self.settings.url)
            .bearer_auth(api_key)
            .json(&body)
            .build()?)
    }

    pub async fn request(&self, facts: &CommentaryFacts) -> Result<String, CommentaryError> {
        let req = self.build_request(facts)?;
        info!(
            "Requesting commentary from {} (model {}, {} assets)",
            self.settings.url,
            self.settings.model,
            facts.assets.len()
        );
        let resp = self.http.execute(req).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Commentary provider returned HTTP {}", status.as_u16());
            return Err(CommentaryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = resp.json::<ChatResponse>().await?;
        extract_text(parsed).ok_or(CommentaryError::EmptyResponse)
    }
}

fn extract_text(resp: ChatResponse) -> Option<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new(
            &[
                ("SPY", "S&P 500 ETF"),
                ("QQQ", "Nasdaq-100 ETF"),
                ("TLT", "Treasuries"),
                ("IAU", "Gold"),
            ],
            42,
            60,
        )
    }

    #[test]
    fn test_facts_reflect_session() {
        let mut s = session();
        let qqq = s.assets()[1].id;
        s.set_weight(qqq, 0.55).unwrap();
        s.recompute();

        let facts = CommentaryFacts::from_session(&s, "rebalanced toward growth");
        assert_eq!(facts.assets.len(), 4);
        assert_eq!(facts.risk_free_rate, RISK_FREE_RATE);
        assert_eq!(facts.annual_return, s.snapshot().metrics.annual_return);
        assert_eq!(facts.note, "rebalanced toward growth");

        let top = facts.concentration.clone().unwrap();
        assert_eq!(top.ticker, "QQQ");
        assert!((top.weight - 0.55).abs() < 1e-12);

        assert_eq!(facts.data_quality.aligned_points, 60);
        assert!(facts.data_quality.assets.iter().all(|a| a.source == "MOCK" && a.points == 60));
    }

    #[test]
    fn test_top_correlations_are_sorted_and_capped() {
        let s = session();
        let facts = CommentaryFacts::from_session(&s, "");
        assert_eq!(facts.top_correlations.len(), 3);
        for pair in facts.top_correlations.windows(2) {
            assert!(pair[0].correlation >= pair[1].correlation);
        }
        // Index funds share the market factor and should rank first.
        let first = &facts.top_correlations[0];
        assert_eq!((first.a.as_str(), first.b.as_str()), ("SPY", "QQQ"));
    }

    #[test]
    fn test_payload_uses_camel_case_and_csv_tag() {
        let mut s = session();
        let spy = s.assets()[0].id;
        let mut csv = String::from("Date,Close\n");
        for i in 0..16 {
            csv.push_str(&format!("{}-{:02}-01,{}\n", 2000 + i / 12, i % 12 + 1, 100 + i));
        }
        s.upload_csv(spy, Some("spy.csv"), &csv).unwrap();
        s.recompute();

        let facts = CommentaryFacts::from_session(&s, "note");
        let json = serde_json::to_value(&facts).unwrap();
        assert!(json.get("annualVolatility").is_some());
        assert!(json.get("topCorrelations").is_some());
        assert_eq!(json["dataQuality"]["alignedPoints"], 15);
        assert_eq!(json["dataQuality"]["assets"][0]["source"], "CSV");
        assert_eq!(json["dataQuality"]["assets"][0]["filename"], "spy.csv");
        assert!(json["dataQuality"]["assets"][1].get("filename").is_none());
    }

    #[test]
    fn test_extract_text() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Looks balanced. "}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(resp), Some("Looks balanced.".to_string()));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text(empty), None);
    }

    #[test]
    fn test_request_is_a_single_untimed_post() {
        let client = CommentaryClient::new(LlmSettings {
            api_key: Some("sk-test".to_string()),
            url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
        });
        let facts = CommentaryFacts::from_session(&session(), "hedged");
        let req = client.build_request(&facts).unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().path(), "/v1/chat/completions");
        assert!(req.timeout().is_none());
        assert_eq!(
            req.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer sk-test"
        );

        let bytes = req.body().and_then(|b| b.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        let user: serde_json::Value =
            serde_json::from_str(body["messages"][1]["content"].as_str().unwrap()).unwrap();
        assert_eq!(user["note"], "hedged");
        assert_eq!(user["assets"].as_array().map(Vec::len), Some(facts.assets.len()));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let client = CommentaryClient::new(LlmSettings {
            api_key: None,
            url: "http://127.0.0.1:9/unused".to_string(),
            model: "test".to_string(),
        });
        assert!(!client.is_configured());
        let facts = CommentaryFacts::from_session(&session(), "");
        assert!(matches!(
            client.request(&facts).await,
            Err(CommentaryError::MissingCredential)
        ));
    }
}
