//! The analysis conversation.
//!
//! An [`AnalysisSession`] is an append-only log of user prompts and assistant
//! answers. Submissions are single-flight for the whole session: while one
//! analysis is outstanding every further submission is rejected without
//! touching the log.

use crate::source::{FetchResult, TelemetrySource};
use crate::telemetry::{AnalysisResult, IndicatorKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sn_observability::{analysis_span, record_analysis};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Message appended when an analysis fails for any reason.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Error: Unable to analyze target. Please ensure the backend API is running.";

/// Optional first assistant turn.
pub const GREETING: &str = "Co-Pilot initialized. Enter an IP address or URL for threat analysis.";

/// Why a submission was not accepted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Target is empty")]
    EmptyTarget,

    #[error("An analysis is already in flight")]
    InFlight,
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content of a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    /// A submitted indicator.
    Prompt { target: String, kind: IndicatorKind },
    /// A completed analysis.
    Result(AnalysisResult),
    /// A failed analysis.
    Failure { message: String },
    /// An informational notice.
    Notice { message: String },
}

/// One entry of the session log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: Role,
    pub content: TurnContent,
    pub at: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: TurnContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            at: Utc::now(),
        }
    }

    /// Plain-text rendering of the turn.
    pub fn text(&self) -> String {
        match &self.content {
            TurnContent::Prompt { target, .. } => target.clone(),
            TurnContent::Result(result) => result.report(),
            TurnContent::Failure { message } | TurnContent::Notice { message } => message.clone(),
        }
    }
}

/// The conversation log plus the session-wide in-flight flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionLog {
    pub turns: Vec<Turn>,
    pub in_flight: bool,
}

impl SessionLog {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

/// Sequential, single-flight analysis conversation.
#[derive(Clone)]
pub struct AnalysisSession {
    source: Arc<dyn TelemetrySource>,
    log: Arc<watch::Sender<SessionLog>>,
}

impl AnalysisSession {
    /// Creates a session with an empty log.
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        let (tx, _rx) = watch::channel(SessionLog::default());
        Self {
            source,
            log: Arc::new(tx),
        }
    }

    /// Creates a session whose log opens with the greeting notice.
    pub fn with_greeting(source: Arc<dyn TelemetrySource>) -> Self {
        let session = Self::new(source);
        session.log.send_modify(|log| {
            log.turns.push(Turn::new(
                Role::Assistant,
                TurnContent::Notice {
                    message: GREETING.to_string(),
                },
            ));
        });
        session
    }

    /// Submits a target for analysis.
    ///
    /// Acceptance is synchronous: on `Ok` the user turn is already in the log
    /// and the session is in flight. The returned handle resolves once the
    /// assistant turn has been appended. Must be called from within a tokio
    /// runtime.
    pub fn submit(&self, target: &str) -> Result<JoinHandle<()>, SubmitRejected> {
        let target = target.trim();
        if target.is_empty() {
            return Err(SubmitRejected::EmptyTarget);
        }

        let kind = IndicatorKind::classify(target);
        let accepted = self.log.send_if_modified(|log| {
            if log.in_flight {
                return false;
            }
            log.turns.push(Turn::new(
                Role::User,
                TurnContent::Prompt {
                    target: target.to_string(),
                    kind,
                },
            ));
            log.in_flight = true;
            true
        });
        if !accepted {
            return Err(SubmitRejected::InFlight);
        }

        info!(indicator = %target, kind = %kind, "Analysis submitted");

        let source = Arc::clone(&self.source);
        let log = Arc::clone(&self.log);
        let target = target.to_string();
        let span = analysis_span!(target);
        Ok(tokio::spawn(
            async move {
                let outcome = run_analysis(source.as_ref(), &target).await;
                record_analysis(outcome.is_ok());
                let content = match outcome {
                    Ok(result) => {
                        info!(
                            risk_score = result.risk_score,
                            threat_level = %result.threat_level,
                            "Analysis completed"
                        );
                        TurnContent::Result(result)
                    }
                    Err(e) => {
                        warn!(error = %e, "Analysis failed");
                        TurnContent::Failure {
                            message: ANALYSIS_FAILED_MESSAGE.to_string(),
                        }
                    }
                };
                log.send_modify(|log| {
                    log.turns.push(Turn::new(Role::Assistant, content));
                    log.in_flight = false;
                });
            }
            .instrument(span),
        ))
    }

    /// Returns true while an analysis is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.log.borrow().in_flight
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> SessionLog {
        self.log.borrow().clone()
    }

    /// Subscribes to log changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionLog> {
        self.log.subscribe()
    }
}

async fn run_analysis(source: &dyn TelemetrySource, target: &str) -> FetchResult<AnalysisResult> {
    let mut result = source.analyze(target).await?;
    result.validate()?;
    if result.target.is_empty() {
        result.target = target.to_string();
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{MockEndpoint, MockReply, MockTelemetrySource};
    use crate::source::FetchError;
    use crate::severity::Severity;
    use std::time::Duration;

    fn verdict(score: u8) -> AnalysisResult {
        AnalysisResult {
            target: String::new(),
            risk_score: score,
            threat_level: Severity::High,
            findings: vec!["Listed on 3 blocklists".to_string()],
            recommendations: vec!["Block at perimeter".to_string()],
        }
    }

    #[tokio::test]
    async fn test_empty_target_rejected() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        let session = AnalysisSession::new(mock.clone());

        assert_eq!(session.submit("").unwrap_err(), SubmitRejected::EmptyTarget);
        assert_eq!(session.submit("   ").unwrap_err(), SubmitRejected::EmptyTarget);
        assert!(session.snapshot().is_empty());
        assert_eq!(mock.calls_to(MockEndpoint::Analyze).await, 0);
    }

    #[tokio::test]
    async fn test_success_appends_result() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        mock.push_analysis(MockReply::ok(verdict(72))).await;
        let session = AnalysisSession::new(mock.clone());

        let handle = session.submit("  8.8.8.8 ").unwrap();
        let log = session.snapshot();
        assert_eq!(log.len(), 1);
        assert!(log.in_flight);
        assert_eq!(
            log.turns[0].content,
            TurnContent::Prompt {
                target: "8.8.8.8".to_string(),
                kind: IndicatorKind::Ip
            }
        );

        handle.await.unwrap();
        let log = session.snapshot();
        assert_eq!(log.len(), 2);
        assert!(!log.in_flight);
        assert_eq!(log.turns[1].role, Role::Assistant);
        match &log.turns[1].content {
            TurnContent::Result(result) => {
                assert_eq!(result.risk_score, 72);
                assert_eq!(result.target, "8.8.8.8");
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_appends_generic_message() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        mock.push_analysis(MockReply::err(FetchError::ServerError { status: 500 }))
            .await;
        let session = AnalysisSession::new(mock.clone());

        session.submit("evil.example.com").unwrap().await.unwrap();

        let log = session.snapshot();
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns[1].text(), ANALYSIS_FAILED_MESSAGE);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_failure() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        mock.push_analysis(MockReply::ok(verdict(150))).await;
        let session = AnalysisSession::new(mock.clone());

        session.submit("example.org").unwrap().await.unwrap();

        assert!(matches!(
            session.snapshot().turns[1].content,
            TurnContent::Failure { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        mock.push_analysis(MockReply::ok(verdict(40)).after(Duration::from_secs(2)))
            .await;
        let session = AnalysisSession::new(mock.clone());

        let handle = session.submit("8.8.8.8").unwrap();
        assert_eq!(session.submit("8.8.8.8").unwrap_err(), SubmitRejected::InFlight);
        assert_eq!(session.submit("1.1.1.1").unwrap_err(), SubmitRejected::InFlight);
        assert_eq!(session.snapshot().len(), 1);

        handle.await.unwrap();
        assert_eq!(session.snapshot().len(), 2);
        assert_eq!(mock.calls_to(MockEndpoint::Analyze).await, 1);

        // Accepted again once the first resolved.
        assert!(session.submit("1.1.1.1").is_ok());
    }

    #[tokio::test]
    async fn test_greeting_is_first_turn() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        let session = AnalysisSession::with_greeting(mock);

        let log = session.snapshot();
        assert_eq!(log.len(), 1);
        assert_eq!(log.turns[0].role, Role::Assistant);
        assert_eq!(log.turns[0].text(), GREETING);
        assert!(!log.in_flight);
    }
}
