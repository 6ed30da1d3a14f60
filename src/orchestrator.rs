//! Orchestrator: runs every probe once, in order, and collects a report.
//!
//! DESIGN
//! ======
//! Session first, then the unauthenticated checks, then the authenticated
//! ones. A missing session prints a remediation hint and marks the
//! authenticated checks as skipped; nothing else stops the run. Verdicts are
//! advisory and never change the process exit status.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;

use crate::checks::{self, AGENTS_PATH};
use crate::config::ProbeSettings;
use crate::runner::Outcome;
use crate::session::{SessionProvider, probe_session};
use crate::transport::HttpTransport;

pub const CHECK_SESSION: &str = "Session";
pub const CHECK_HEALTH: &str = "Backend Health";
pub const CHECK_FLAG: &str = "Feature Flag";
pub const CHECK_AGENTS_GUARD: &str = "Agents Auth Guard";
pub const CHECK_PROFILE: &str = "User Profile";
pub const CHECK_INITIATE: &str = "Agent Initiation";
pub const CHECK_AGENTS_LISTING: &str = "Agents Listing";

const REMEDIATION: [&str; 3] = [
    "user needs to log in first",
    "sign in through the web app and pass its access token with --access-token",
    "or configure --auth-url, --anon-key, --email and --password to sign in directly",
];

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Skipped,
}

impl Verdict {
    fn from_passed(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skipped => "SKIP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub verdict: Verdict,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub checks: Vec<CheckResult>,
    pub agents_feature_working: bool,
}

impl Report {
    fn record(&mut self, name: &str, verdict: Verdict, detail: impl Into<String>) {
        let detail = detail.into();
        match verdict {
            Verdict::Pass => tracing::info!(check = name, %detail, "PASS"),
            Verdict::Fail => tracing::error!(check = name, %detail, "FAIL"),
            Verdict::Skipped => tracing::warn!(check = name, %detail, "SKIP"),
        }
        self.checks.push(CheckResult { name: name.to_owned(), verdict, detail });
    }

    fn record_outcome(&mut self, name: &str, outcome: &Outcome) {
        self.record(name, Verdict::from_passed(outcome.is_success()), outcome.summary());
    }

    #[must_use]
    pub fn verdict(&self, name: &str) -> Option<Verdict> {
        self.checks.iter().find(|check| check.name == name).map(|check| check.verdict)
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.verdict != Verdict::Fail)
    }

    /// Plain-text summary table.
    #[must_use]
    pub fn render(&self) -> String {
        let width = self.checks.iter().map(|check| check.name.len()).max().unwrap_or(0);
        let mut out = String::from("Test Results:\n====================\n");
        for check in &self.checks {
            let _ = writeln!(
                out,
                "{:<width$}  {}  {}",
                check.name,
                check.verdict.label(),
                check.detail,
                width = width
            );
        }
        let conclusion = if self.agents_feature_working {
            "SUCCESS: agents feature is working end to end"
        } else {
            "FAILURE: issues detected in the agents flow"
        };
        let failed = self.checks.iter().filter(|check| check.verdict == Verdict::Fail).count();
        if self.all_passed() {
            let _ = writeln!(out, "\nNo failed checks.");
        } else {
            let _ = writeln!(out, "\n{failed} of {} checks failed.", self.checks.len());
        }
        let _ = writeln!(out, "{conclusion}");
        out
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

pub struct Orchestrator {
    transport: Arc<dyn HttpTransport>,
    provider: Option<Arc<dyn SessionProvider>>,
    settings: ProbeSettings,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        provider: Option<Arc<dyn SessionProvider>>,
        settings: ProbeSettings,
    ) -> Self {
        Self { transport, provider, settings }
    }

    pub async fn run(&self) -> Report {
        let transport = self.transport.as_ref();
        let api = &self.settings.api;
        let mut report = Report::default();

        tracing::info!(backend = api.base_url().unwrap_or("same-origin"), "running auth probes");

        let session = match probe_session(self.provider.as_deref()).await {
            Ok(session) => {
                report.record(
                    CHECK_SESSION,
                    Verdict::Pass,
                    format!("user {} (expires {})", session.user_id, session.expires_at_display()),
                );
                Some(session)
            }
            Err(e) => {
                report.record(CHECK_SESSION, Verdict::Fail, e.to_string());
                None
            }
        };

        let health = checks::check_health(transport, api).await;
        report.record_outcome(CHECK_HEALTH, &health);

        let flag_name = &self.settings.flag_name;
        let flag_enabled = match checks::check_flag(transport, api, flag_name).await {
            Ok(status) => {
                let state = if status.enabled { "enabled" } else { "disabled" };
                report.record(CHECK_FLAG, Verdict::from_passed(status.enabled), format!("{flag_name} {state}"));
                status.enabled
            }
            Err(e) => {
                report.record(CHECK_FLAG, Verdict::Fail, format!("{flag_name}: {e}"));
                false
            }
        };

        let guard = checks::check_endpoint_auth_guard(transport, &api.url(AGENTS_PATH)).await;
        report.record(CHECK_AGENTS_GUARD, Verdict::from_passed(guard.passed()), guard.summary());

        let listing_ok = if let Some(session) = &session {
            let profile = checks::fetch_profile(transport, session, api).await;
            report.record_outcome(CHECK_PROFILE, &profile);

            let initiate = checks::initiate_agent(transport, session, api, &self.settings.initiate).await;
            report.record_outcome(CHECK_INITIATE, &initiate);

            if flag_enabled {
                let listing = checks::list_agents(transport, session, api).await;
                let detail = match &listing {
                    Outcome::Success(payload) => format!("{} agents", checks::agent_count(payload)),
                    other => other.summary(),
                };
                report.record(CHECK_AGENTS_LISTING, Verdict::from_passed(listing.is_success()), detail);
                listing.is_success()
            } else {
                report.record(CHECK_AGENTS_LISTING, Verdict::Skipped, format!("{flag_name} is disabled"));
                false
            }
        } else {
            for line in REMEDIATION {
                tracing::warn!("{line}");
            }
            for name in [CHECK_PROFILE, CHECK_INITIATE, CHECK_AGENTS_LISTING] {
                report.record(name, Verdict::Skipped, "no active session");
            }
            true
        };

        report.agents_feature_working = flag_enabled && guard.passed() && listing_ok;
        tracing::info!(
            agents_feature_working = report.agents_feature_working,
            "authentication test complete"
        );
        report
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
