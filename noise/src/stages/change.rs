//! Change Stage: branch → seed file → pull request → review → merge → cleanup.
//!
//! Each step depends on the previous one. A failure after the branch exists
//! but before a pull request is open deletes the branch (best-effort) before
//! propagating; a merge failure leaves branch and pull request in place for
//! inspection.

use anyhow::{Context, Result, anyhow, bail};
use rand::Rng;
use tracing::{info, warn};

use crate::core::classify::{FailureClass, classify_api_error};
use crate::core::content::{
    branch_name, pull_request_draft, review_body, seed_commit_message, seed_content,
    seed_file_path,
};
use crate::core::gate::GateRoll;
use crate::core::types::{BranchStrategy, ReviewEvent, RunContext};
use crate::io::git::Vcs;
use crate::io::github::{FileWrite, Platform, PullRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Approved,
    Commented,
    /// Approval was rejected as self-approval; a comment review was left instead.
    CommentedAfterSelfApproval,
    /// No review attached; merge proceeded anyway.
    Missing { class: FailureClass, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Skipped(GateRoll),
    Merged {
        branch: String,
        pull_number: u64,
        review: ReviewOutcome,
        /// False when the remote branch could not be deleted after merge.
        branch_deleted: bool,
    },
}

pub fn run_change_stage<V: Vcs, P: Platform, R: Rng + ?Sized>(
    ctx: &RunContext,
    vcs: &V,
    platform: &P,
    rng: &mut R,
) -> Result<ChangeOutcome> {
    let branch = branch_name(&ctx.layout.branch_prefix, ctx.started_at);
    publish_branch(ctx, vcs, platform, &branch)?;
    info!(branch = %branch, strategy = ?ctx.layout.branch_strategy, "branch published");

    let pull = match seed_and_open(ctx, platform, rng, &branch) {
        Ok(pull) => pull,
        Err(err) => {
            abandon_branch(platform, &branch);
            return Err(err);
        }
    };
    info!(number = pull.number, branch = %branch, "pull request opened");

    request_reviewers(ctx, platform, pull.number);
    let review = attach_review(platform, pull.number, ReviewEvent::from(ctx.review_mode));

    merge(platform, &pull, &branch)?;
    let branch_deleted = delete_branch(platform, &branch);

    Ok(ChangeOutcome::Merged {
        branch,
        pull_number: pull.number,
        review,
        branch_deleted,
    })
}

fn publish_branch<V: Vcs, P: Platform>(
    ctx: &RunContext,
    vcs: &V,
    platform: &P,
    branch: &str,
) -> Result<()> {
    match ctx.layout.branch_strategy {
        BranchStrategy::Git => {
            // Start from the remote tip, not HEAD: the commit stage may have
            // left the working copy on another branch.
            let start_point = format!("{}/{}", ctx.layout.remote, ctx.default_branch);
            vcs.checkout_new_branch(branch, &start_point)
                .with_context(|| format!("create local branch {branch} from {start_point}"))?;
            vcs.push_upstream(&ctx.layout.remote, branch)
                .with_context(|| format!("publish branch {branch}"))?;
        }
        BranchStrategy::Api => {
            let sha = platform
                .branch_tip(&ctx.default_branch)
                .with_context(|| format!("look up tip of {}", ctx.default_branch))?;
            platform
                .create_branch(branch, &sha)
                .with_context(|| format!("create branch {branch} at {sha}"))?;
        }
    }
    Ok(())
}

/// Write the seed file on `branch`, then open the pull request.
fn seed_and_open<P: Platform, R: Rng + ?Sized>(
    ctx: &RunContext,
    platform: &P,
    rng: &mut R,
    branch: &str,
) -> Result<PullRequest> {
    let path = seed_file_path(&ctx.layout.seed_dir, branch);
    let content = seed_content(ctx.started_at);
    let message = seed_commit_message(&path);
    platform
        .put_file(&FileWrite {
            path: &path,
            content: &content,
            message: &message,
            branch,
            identity: &ctx.committer,
        })
        .with_context(|| format!("write {path} on {branch}"))?;

    let draft = pull_request_draft(rng, branch);
    let pull = platform
        .create_pull_request(&draft.title, &draft.body, branch, &ctx.default_branch)
        .with_context(|| format!("open pull request {branch} -> {}", ctx.default_branch))?;
    Ok(pull)
}

fn abandon_branch<P: Platform>(platform: &P, branch: &str) {
    match platform.delete_branch(branch) {
        Ok(()) => warn!(
            branch,
            "change stage failed before a pull request existed; branch deleted"
        ),
        Err(err) => warn!(
            branch,
            error = %err,
            "change stage failed and branch could not be deleted; abandoning it on the remote"
        ),
    }
}

fn request_reviewers<P: Platform>(ctx: &RunContext, platform: &P, number: u64) {
    if ctx.reviewers.is_empty() {
        return;
    }
    match platform.request_reviewers(number, &ctx.reviewers) {
        Ok(()) => info!(number, reviewers = ?ctx.reviewers, "reviewers requested"),
        Err(err) => warn!(number, error = %err, "could not request reviewers"),
    }
}

/// Attach exactly one review. A self-approval rejection gets one comment
/// review as fallback; every other failure is logged and merge proceeds.
fn attach_review<P: Platform>(platform: &P, number: u64, event: ReviewEvent) -> ReviewOutcome {
    let err = match platform.create_review(number, event, review_body(event)) {
        Ok(()) => {
            info!(number, event = event.as_str(), "review attached");
            return match event {
                ReviewEvent::Approve => ReviewOutcome::Approved,
                ReviewEvent::Comment => ReviewOutcome::Commented,
            };
        }
        Err(err) => err,
    };

    match classify_api_error(&err) {
        FailureClass::SelfApproval if event == ReviewEvent::Approve => {
            info!(number, "author cannot approve own pull request, leaving a comment review");
            let fallback = ReviewEvent::Comment;
            match platform.create_review(number, fallback, review_body(fallback)) {
                Ok(()) => ReviewOutcome::CommentedAfterSelfApproval,
                Err(err) => {
                    let class = classify_api_error(&err);
                    warn!(number, ?class, error = %err, "fallback comment review failed");
                    ReviewOutcome::Missing {
                        class,
                        reason: err.to_string(),
                    }
                }
            }
        }
        class => {
            warn!(number, ?class, error = %err, "review not attached");
            ReviewOutcome::Missing {
                class,
                reason: err.to_string(),
            }
        }
    }
}

fn merge<P: Platform>(platform: &P, pull: &PullRequest, branch: &str) -> Result<()> {
    let number = pull.number;
    match platform.merge_pull_request(number) {
        Ok(outcome) if outcome.merged => {
            info!(number, sha = ?outcome.sha, "pull request merged");
            Ok(())
        }
        Ok(_) => {
            warn!(number, branch, "merge not performed; leaving branch and pull request open");
            bail!("merge pull request #{number}: platform reported merged=false")
        }
        Err(err) => {
            warn!(number, branch, "merge failed; leaving branch and pull request open");
            Err(anyhow!(err).context(format!("merge pull request #{number}")))
        }
    }
}

/// Best-effort; returns whether the remote branch is gone.
fn delete_branch<P: Platform>(platform: &P, branch: &str) -> bool {
    match platform.delete_branch(branch) {
        Ok(()) => {
            info!(branch, "branch deleted");
            true
        }
        Err(err) => {
            warn!(branch, error = %err, "merged branch could not be deleted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::Probability;
    use crate::test_support::{
        FAKE_PULL_NUMBER, FakePlatform, FakeVcs, context, self_approval_error, status_error,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BRANCH: &str = "noise/1773480413000";

    fn run(
        ctx: &RunContext,
        vcs: &FakeVcs,
        platform: &FakePlatform,
    ) -> Result<ChangeOutcome> {
        run_change_stage(ctx, vcs, platform, &mut StdRng::seed_from_u64(8))
    }

    #[test]
    fn full_cycle_with_comment_review() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let outcome = run(&ctx, &vcs, &platform).expect("change stage");
        assert_eq!(
            outcome,
            ChangeOutcome::Merged {
                branch: BRANCH.to_string(),
                pull_number: FAKE_PULL_NUMBER,
                review: ReviewOutcome::Commented,
                branch_deleted: true,
            }
        );
        assert_eq!(
            vcs.calls(),
            vec![
                format!("checkout -b {BRANCH} origin/main"),
                format!("push -u origin {BRANCH}"),
            ]
        );
        assert_eq!(
            platform.calls(),
            vec![
                format!("put_file branches/{BRANCH}.txt@{BRANCH}"),
                format!("create_pull_request {BRANCH}->main"),
                format!("create_review #{FAKE_PULL_NUMBER} COMMENT"),
                format!("merge_pull_request #{FAKE_PULL_NUMBER}"),
                format!("delete_branch {BRANCH}"),
            ]
        );
    }

    #[test]
    fn seed_file_is_stamped_with_committer() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);
        run(&ctx, &vcs, &platform).expect("change stage");

        let files = platform.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "hello 2026-03-14T09:26:53.000Z\n");
        assert_eq!(files[0].identity, ctx.committer);
        assert_eq!(files[0].message, format!("feat: add branches/{BRANCH}.txt"));
    }

    #[test]
    fn self_approval_falls_back_to_one_comment() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next("create_review", self_approval_error());
        let ctx = context(Probability::NEVER, Probability::ALWAYS, true);

        let outcome = run(&ctx, &vcs, &platform).expect("change stage");
        let ChangeOutcome::Merged { review, .. } = outcome else {
            panic!("expected merge");
        };
        assert_eq!(review, ReviewOutcome::CommentedAfterSelfApproval);
        let reviews: Vec<String> = platform
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("create_review"))
            .collect();
        assert_eq!(
            reviews,
            vec![
                format!("create_review #{FAKE_PULL_NUMBER} APPROVE"),
                format!("create_review #{FAKE_PULL_NUMBER} COMMENT"),
            ]
        );
        assert!(platform.calls().contains(&format!("merge_pull_request #{FAKE_PULL_NUMBER}")));
    }

    #[test]
    fn approval_success_needs_no_fallback() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        let ctx = context(Probability::NEVER, Probability::ALWAYS, true);

        let outcome = run(&ctx, &vcs, &platform).expect("change stage");
        assert!(matches!(
            outcome,
            ChangeOutcome::Merged { review: ReviewOutcome::Approved, .. }
        ));
        assert_eq!(
            platform
                .calls()
                .iter()
                .filter(|call| call.starts_with("create_review"))
                .count(),
            1
        );
    }

    #[test]
    fn other_review_failure_is_swallowed_without_retry() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "create_review",
            status_error("POST", "/pulls/202/reviews", 403, "Resource not accessible"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, true);

        let outcome = run(&ctx, &vcs, &platform).expect("change stage");
        let ChangeOutcome::Merged { review, .. } = outcome else {
            panic!("expected merge");
        };
        assert!(matches!(
            review,
            ReviewOutcome::Missing { class: FailureClass::Other, .. }
        ));
        assert_eq!(
            platform
                .calls()
                .iter()
                .filter(|call| call.starts_with("create_review"))
                .count(),
            1
        );
    }

    #[test]
    fn merge_failure_is_fatal_and_keeps_branch() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "merge_pull_request",
            status_error("PUT", "/pulls/202/merge", 405, "Pull Request is not mergeable"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let err = run(&ctx, &vcs, &platform).unwrap_err();
        assert!(format!("{err:#}").contains("merge pull request #202"));
        assert!(!platform.calls().iter().any(|call| call.starts_with("delete_branch")));
    }

    #[test]
    fn unmerged_response_is_fatal() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.report_unmerged();
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        assert!(run(&ctx, &vcs, &platform).is_err());
        assert!(!platform.calls().iter().any(|call| call.starts_with("delete_branch")));
    }

    #[test]
    fn delete_failure_is_reported_not_fatal() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "delete_branch",
            status_error("DELETE", "/git/refs/heads/x", 422, "Reference does not exist"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let outcome = run(&ctx, &vcs, &platform).expect("change stage");
        assert!(matches!(
            outcome,
            ChangeOutcome::Merged { branch_deleted: false, .. }
        ));
    }

    #[test]
    fn pull_request_failure_abandons_branch() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "create_pull_request",
            status_error("POST", "/pulls", 422, "No commits between main and branch"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let err = run(&ctx, &vcs, &platform).unwrap_err();
        assert!(format!("{err:#}").contains("open pull request"));
        let calls = platform.calls();
        assert_eq!(calls.last(), Some(&format!("delete_branch {BRANCH}")));
        assert!(!calls.iter().any(|call| call.starts_with("merge_pull_request")));
    }

    #[test]
    fn seed_file_failure_abandons_branch() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "put_file",
            status_error("PUT", "/contents/branches/x.txt", 409, "sha wasn't supplied"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let err = run(&ctx, &vcs, &platform).unwrap_err();
        assert!(format!("{err:#}").contains(&format!("write branches/{BRANCH}.txt")));
        assert_eq!(
            platform.calls(),
            vec![
                format!("put_file branches/{BRANCH}.txt@{BRANCH}"),
                format!("delete_branch {BRANCH}"),
            ]
        );
    }

    #[test]
    fn failed_abandon_keeps_original_error() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "create_pull_request",
            status_error("POST", "/pulls", 422, "No commits between main and branch"),
        );
        platform.fail_next(
            "delete_branch",
            status_error("DELETE", "/git/refs/heads/x", 403, "protected"),
        );
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        let err = run(&ctx, &vcs, &platform).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("open pull request"));
        assert!(chain.contains("No commits between"));
        assert!(!chain.contains("protected"));
        let calls = platform.calls();
        assert_eq!(calls.last(), Some(&format!("delete_branch {BRANCH}")));
        assert!(!calls.iter().any(|call| call.starts_with("merge_pull_request")));
    }

    #[test]
    fn branch_push_failure_stops_before_platform_calls() {
        let vcs = FakeVcs::new();
        vcs.fail_on("push-upstream");
        let platform = FakePlatform::new();
        let ctx = context(Probability::NEVER, Probability::ALWAYS, false);

        assert!(run(&ctx, &vcs, &platform).is_err());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn api_strategy_creates_ref_from_default_tip() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        let mut ctx = context(Probability::NEVER, Probability::ALWAYS, false);
        ctx.layout.branch_strategy = BranchStrategy::Api;

        run(&ctx, &vcs, &platform).expect("change stage");
        assert!(vcs.calls().is_empty());
        let calls = platform.calls();
        assert_eq!(calls[0], "branch_tip main");
        assert_eq!(calls[1], format!("create_branch {BRANCH}"));
    }

    #[test]
    fn reviewers_are_requested_best_effort() {
        let vcs = FakeVcs::new();
        let platform = FakePlatform::new();
        platform.fail_next(
            "request_reviewers",
            status_error("POST", "/pulls/202/requested_reviewers", 422, "not a collaborator"),
        );
        let mut ctx = context(Probability::NEVER, Probability::ALWAYS, false);
        ctx.reviewers = vec!["alice".to_string(), "bob".to_string()];

        run(&ctx, &vcs, &platform).expect("change stage");
        assert!(
            platform
                .calls()
                .contains(&format!("request_reviewers #{FAKE_PULL_NUMBER} alice,bob"))
        );
    }
}
