//! Issue Stage: open an issue and close it straight away.

use rand::Rng;
use tracing::{error, info, warn};

use crate::core::content::issue_draft;
use crate::core::gate::GateRoll;
use crate::core::types::RunContext;
use crate::io::github::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Skipped(GateRoll),
    Closed { number: u64 },
    /// Creation failed; nothing exists on the platform.
    Failed { reason: String },
    /// Created but the close call failed; the issue is dangling.
    LeftOpen { number: u64, reason: String },
}

pub fn run_issue_stage<P: Platform, R: Rng + ?Sized>(
    ctx: &RunContext,
    platform: &P,
    rng: &mut R,
) -> IssueOutcome {
    let draft = issue_draft(rng, ctx.started_at);
    let issue = match platform.create_issue(&draft.title, &draft.body) {
        Ok(issue) => issue,
        Err(err) => {
            warn!(error = %err, "issue not created");
            return IssueOutcome::Failed {
                reason: err.to_string(),
            };
        }
    };
    info!(number = issue.number, title = %draft.title, "issue opened");

    match platform.close_issue(issue.number) {
        Ok(_) => {
            info!(number = issue.number, "issue closed");
            IssueOutcome::Closed {
                number: issue.number,
            }
        }
        Err(err) => {
            error!(
                number = issue.number,
                error = %err,
                "issue left open; close it manually"
            );
            IssueOutcome::LeftOpen {
                number: issue.number,
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::Probability;
    use crate::test_support::{FAKE_ISSUE_NUMBER, FakePlatform, context, status_error};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn opens_then_closes() {
        let platform = FakePlatform::new();
        let ctx = context(Probability::ALWAYS, Probability::NEVER, false);
        let outcome = run_issue_stage(&ctx, &platform, &mut StdRng::seed_from_u64(3));

        assert_eq!(
            outcome,
            IssueOutcome::Closed {
                number: FAKE_ISSUE_NUMBER
            }
        );
        assert_eq!(
            platform.calls(),
            vec![
                "create_issue".to_string(),
                format!("close_issue #{FAKE_ISSUE_NUMBER}"),
            ]
        );
    }

    #[test]
    fn create_failure_skips_close() {
        let platform = FakePlatform::new();
        platform.fail_next("create_issue", status_error("POST", "/issues", 410, "Issues are disabled"));
        let ctx = context(Probability::ALWAYS, Probability::NEVER, false);

        let outcome = run_issue_stage(&ctx, &platform, &mut StdRng::seed_from_u64(3));
        assert!(matches!(outcome, IssueOutcome::Failed { ref reason } if reason.contains("410")));
        assert_eq!(platform.calls(), vec!["create_issue"]);
    }

    #[test]
    fn close_failure_reports_dangling_issue() {
        let platform = FakePlatform::new();
        platform.fail_next("close_issue", status_error("PATCH", "/issues/101", 500, "boom"));
        let ctx = context(Probability::ALWAYS, Probability::NEVER, false);

        let outcome = run_issue_stage(&ctx, &platform, &mut StdRng::seed_from_u64(3));
        assert!(matches!(
            outcome,
            IssueOutcome::LeftOpen { number, .. } if number == FAKE_ISSUE_NUMBER
        ));
    }
}
