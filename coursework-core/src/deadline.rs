use std::collections::HashMap;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{info, instrument, warn};

use coursework_contracts::error::StoreResult;
use coursework_contracts::journal::Visibility;
use coursework_model::stage::Component;
use coursework_model::PeerReviewAssignment;

use crate::context::CoreContext;

const EMPTY_TAG: &str = "EMPTY";

/// What one DeadlineRunner entry point did, for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct StageSummary {
    pub released: usize,
    pub denied: usize,
    pub reopened: usize,
    pub tags_created: usize,
}

#[instrument(skip(ctx))]
pub async fn initial(ctx: &CoreContext, asn: &str) -> StoreResult<StageSummary> {
    let assignment = require_assignment(ctx, asn).await?;
    let mut summary = StageSummary::default();

    let mapping = ctx.gradeables.most_recent_per_user(asn, Component::Initial).await?;
    let mut eligible = Vec::new();
    for (user, gradeable) in &mapping {
        match gradeable {
            None => {
                ctx.journal.set_visibility(user, Visibility::Deny).await?;
                summary.denied += 1;
            }
            Some(_) => eligible.push(user.clone()),
        }
    }

    let pairings = build_pairings(asn, &eligible);
    if !pairings.is_empty() {
        ctx.peer_review.insert_many(&pairings).await?;
    }

    for (user, gradeable) in &mapping {
        if let Some(gradeable) = gradeable {
            release_patchset(ctx, &gradeable.submission_id).await?;
            summary.released += 1;
        }
        let _ = user;
    }

    update_tags(ctx, &assignment.name, &[Component::Initial], &mapping).await?;
    run_automated_checks(ctx, &assignment.name, &[Component::Initial], false).await?;
    summary.tags_created = mapping.len();
    Ok(summary)
}

#[instrument(skip(ctx))]
pub async fn peer_review(ctx: &CoreContext, asn: &str) -> StoreResult<StageSummary> {
    let assignment = require_assignment(ctx, asn).await?;
    let mut summary = StageSummary::default();

    let review1 = ctx.gradeables.most_recent_per_user(asn, Component::Review1).await?;
    let review2 = ctx.gradeables.most_recent_per_user(asn, Component::Review2).await?;

    for mapping in [&review1, &review2] {
        for (_, gradeable) in mapping {
            if let Some(gradeable) = gradeable {
                release_patchset(ctx, &gradeable.submission_id).await?;
                summary.released += 1;
            }
        }
    }

    update_tags(ctx, &assignment.name, &[Component::Review1], &review1).await?;
    update_tags(ctx, &assignment.name, &[Component::Review2], &review2).await?;
    run_automated_checks(ctx, &assignment.name, &[Component::Review1, Component::Review2], true).await?;
    summary.tags_created = review1.len() + review2.len();
    Ok(summary)
}

#[instrument(skip(ctx))]
pub async fn final_stage(ctx: &CoreContext, asn: &str) -> StoreResult<StageSummary> {
    let assignment = require_assignment(ctx, asn).await?;
    let mut summary = StageSummary::default();

    let mapping = ctx.gradeables.most_recent_per_user(asn, Component::Final).await?;
    let mapping: HashMap<_, _> = mapping.into_iter().collect();

    let oopsies = ctx.oopsies.list_for_assignment(asn).await?;
    for oopsie in &oopsies {
        if matches!(mapping.get(&oopsie.user), Some(Some(_))) {
            ctx.journal.set_visibility(&oopsie.user, Visibility::Allow).await?;
            summary.reopened += 1;
        }
    }

    for gradeable in mapping.values().flatten() {
        release_patchset(ctx, &gradeable.submission_id).await?;
        summary.released += 1;
    }

    let mapping: Vec<(String, Option<coursework_model::Gradeable>)> = mapping.into_iter().collect();
    update_tags(ctx, &assignment.name, &[Component::Final], &mapping).await?;
    run_automated_checks(ctx, &assignment.name, &[Component::Final], false).await?;
    summary.tags_created = mapping.len();
    Ok(summary)
}

async fn require_assignment(ctx: &CoreContext, asn: &str) -> StoreResult<coursework_model::Assignment> {
    ctx.assignments
        .get(asn)
        .await?
        .ok_or_else(|| coursework_contracts::error::StoreError::NotFound(format!("no such assignment {asn}")))
}

/// Shuffle eligible reviewers, then pair index `i` with `(i+1, i+2) mod n`,
/// saturating to `n` for cohorts smaller than 3.
fn build_pairings(asn: &str, eligible: &[String]) -> Vec<PeerReviewAssignment> {
    let n = eligible.len();
    if n == 0 {
        return Vec::new();
    }
    let mut shuffled = eligible.to_vec();
    shuffled.shuffle(&mut rand::rng());

    shuffled
        .iter()
        .enumerate()
        .map(|(i, reviewer)| {
            let reviewee1 = if n > 1 { Some(shuffled[(i + 1) % n].clone()) } else { None };
            let reviewee2 = if n > 2 { Some(shuffled[(i + 2) % n].clone()) } else { None };
            PeerReviewAssignment { assignment: asn.to_string(), reviewer: reviewer.clone(), reviewee1, reviewee2 }
        })
        .collect()
}

async fn release_patchset(ctx: &CoreContext, submission_id: &str) -> StoreResult<()> {
    let path = ctx.config.patchset_root.join(submission_id);
    let bytes = tokio::fs::read(&path).await?;
    ctx.journal.append(&bytes).await
}

async fn update_tags(
    ctx: &CoreContext,
    asn: &str,
    components: &[Component],
    mappings: &[(String, Option<coursework_model::Gradeable>)],
) -> StoreResult<()> {
    let repo_dir = tempfile::tempdir().map_err(coursework_contracts::error::StoreError::from)?;
    let remote = ctx.config.git.mailman_remote.as_str();
    (*ctx.git)
        .clone_from(remote, repo_dir.path(), coursework_contracts::git::GitIdentity::Mailman, None)
        .await?;

    if !ctx.git.tag_exists(repo_dir.path(), EMPTY_TAG).await? {
        ctx.git.commit_empty_from_file(repo_dir.path(), &empty_message_file()?).await?;
        ctx.git.create_tag(repo_dir.path(), EMPTY_TAG, None, None).await?;
    }

    let component = components.first().copied().unwrap_or(Component::Initial);
    for (user, gradeable) in mappings {
        let tag_name = format!("{asn}_{component}_{user}");
        if ctx.git.tag_exists(repo_dir.path(), &tag_name).await? {
            continue;
        }
        let (reference, message) = match gradeable {
            Some(g) => (Some(g.submission_id.as_str()), g.auto_feedback.as_str().to_string()),
            None => (None, "No gradeable submission".to_string()),
        };
        let target_exists = match reference {
            Some(r) => ctx.git.tag_exists(repo_dir.path(), r).await.unwrap_or(false),
            None => false,
        };
        let reference = if target_exists { reference } else { None };
        ctx.git.create_tag(repo_dir.path(), &tag_name, reference, Some(&message)).await?;
    }

    ctx.git.push_tags(repo_dir.path(), remote).await
}

fn empty_message_file() -> StoreResult<std::path::PathBuf> {
    let path = std::env::temp_dir().join(format!("coursework-empty-commit-{}", uuid::Uuid::new_v4()));
    std::fs::write(&path, "root marker\n").map_err(coursework_contracts::error::StoreError::from)?;
    Ok(path)
}

static SIGNED_OFF_BY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Signed-off-by: .+ <\S+@\S+>$").unwrap());
static SUBJECT_TAG_INITIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[RFC PATCH v(\d+) (\d+)/(\d+)\]").unwrap());
static SUBJECT_TAG_FINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[PATCH v(\d+) (\d+)/(\d+)\]").unwrap());

async fn run_automated_checks(ctx: &CoreContext, asn: &str, components: &[Component], peer: bool) -> StoreResult<()> {
    let repo_dir = tempfile::tempdir().map_err(coursework_contracts::error::StoreError::from)?;
    let remote = ctx.config.git.mailman_remote.as_str();
    (*ctx.git)
        .clone_from(remote, repo_dir.path(), coursework_contracts::git::GitIdentity::Denis, None)
        .await?;
    ctx.git.fetch_notes(repo_dir.path(), remote, &ctx.config.git.notes_ref).await?;

    for component in components {
        let mapping = ctx.gradeables.most_recent_per_user(asn, *component).await?;
        for (user, gradeable) in &mapping {
            let tag = format!("{asn}_{component}_{user}");
            let mut report = String::new();

            report.push_str(&corruption_check(gradeable));

            if !peer {
                let commits = ctx.git.commits_on_tag(repo_dir.path(), &tag).await.unwrap_or_default();
                report.push_str(&signed_off_by_check(&commits));

                let prior = ctx.submissions.count_for_user_and_assignment(asn, user).await.unwrap_or(0);
                report.push_str(&subject_tag_check(&commits, *component, prior));

                let diffstat = ctx.git.diffstat(repo_dir.path(), EMPTY_TAG, &tag).await.unwrap_or_default();
                report.push_str(&diffstat_check(&diffstat));
            }

            ctx.git.add_note(repo_dir.path(), &ctx.config.git.notes_ref, &tag, &report).await?;
        }
    }

    ctx.git.push_notes(repo_dir.path(), remote, &ctx.config.git.notes_ref).await?;
    info!(asn, peer, "automated checks complete");
    Ok(())
}

fn heading(title: &str) -> String {
    format!("{title}\n{}\n", "-".repeat(title.len()))
}

fn corruption_check(gradeable: &Option<coursework_model::Gradeable>) -> String {
    let mut block = heading("Corruption check");
    match gradeable {
        None => block.push_str("0: no gradeable submission found.\n"),
        Some(g) if g.auto_feedback.is_fatal() => block.push_str(&format!("0: {}\n", g.auto_feedback)),
        Some(_) => block.push_str("PASS\n"),
    }
    block
}

fn signed_off_by_check(commits: &[coursework_contracts::git::CommitInfo]) -> String {
    let mut block = heading("Signed-off-by check");
    if commits.is_empty() {
        block.push_str("MALFORMED: no commits found.\n");
        return block;
    }
    let mut missing = Vec::new();
    for (idx, commit) in commits.iter().enumerate() {
        if !SIGNED_OFF_BY.is_match(&commit.body) {
            missing.push(idx + 1);
        }
    }
    if missing.is_empty() {
        block.push_str("PASS\n");
    } else {
        block.push_str(&format!("MISSING on commit(s): {}\n", missing.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")));
    }
    block
}

fn subject_tag_check(commits: &[coursework_contracts::git::CommitInfo], component: Component, prior_submissions: i64) -> String {
    let mut block = heading("Subject tag check");
    let pattern = match component {
        Component::Initial => &*SUBJECT_TAG_INITIAL,
        _ => &*SUBJECT_TAG_FINAL,
    };
    let m = commits.len().saturating_sub(1);
    let mut problems = Vec::new();
    for (idx, commit) in commits.iter().enumerate() {
        match pattern.captures(&commit.subject) {
            None => problems.push(format!("commit {}: missing or malformed subject tag", idx + 1)),
            Some(caps) => {
                let n: i64 = caps[1].parse().unwrap_or(-1);
                let i: usize = caps[2].parse().unwrap_or(usize::MAX);
                let total: usize = caps[3].parse().unwrap_or(usize::MAX);
                if n != prior_submissions {
                    problems.push(format!("commit {}: version {n} does not match submission count {prior_submissions}", idx + 1));
                }
                if i != idx || total != m {
                    problems.push(format!("commit {}: index/total {i}/{total} does not match position {idx}/{m}", idx + 1));
                }
            }
        }
    }
    if problems.is_empty() {
        block.push_str("PASS\n");
    } else {
        for problem in problems {
            block.push_str(&problem);
            block.push('\n');
        }
    }
    block
}

fn diffstat_check(actual: &str) -> String {
    let mut block = heading("Diffstat check");
    block.push_str(actual.trim());
    block.push('\n');
    block
}

pub fn warn_if_empty(asn: &str, component: Component, count: usize) {
    if count == 0 {
        warn!(asn, %component, "no gradeables released at this stage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairings_saturate_for_small_cohorts() {
        let pairings = build_pairings("hw1", &["alice".to_string()]);
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].reviewee1, None);
        assert_eq!(pairings[0].reviewee2, None);

        let pairings = build_pairings("hw1", &["a".into(), "b".into(), "c".into()]);
        assert_eq!(pairings.len(), 3);
        for p in &pairings {
            assert!(p.reviewee1.is_some());
            assert!(p.reviewee2.is_some());
        }
    }

    #[test]
    fn signed_off_by_flags_missing_commits() {
        let commits = vec![
            coursework_contracts::git::CommitInfo { subject: "s".into(), body: "Signed-off-by: Alice <alice@host>".into(), author_email: "a@h".into() },
            coursework_contracts::git::CommitInfo { subject: "s".into(), body: "no trailer here".into(), author_email: "a@h".into() },
        ];
        let report = signed_off_by_check(&commits);
        assert!(report.contains("MISSING on commit(s): 2"));
    }

    #[test]
    fn corruption_check_flags_fatal_feedback() {
        let gradeable = Some(coursework_model::Gradeable {
            submission_id: "s1".into(),
            timestamp: 0,
            user: "alice".into(),
            assignment: "hw1".into(),
            component: Component::Initial,
            auto_feedback: AutoFeedback::new("missing cover letter!"),
        });
        assert!(corruption_check(&gradeable).contains("0:"));
    }
}
