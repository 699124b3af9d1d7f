use std::path::PathBuf;

use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use coursework_contracts::prelude::*;
use coursework_model::stage::{Component, Stage};
use coursework_model::submission::mask_message_id;
use coursework_model::{Gradeable, Submission};
use coursework_server::bootstrap;
use coursework_server::mailsession::read_session_log;

/// Ingests one MailSessionLog: `ingestor <log_dir> <log_file>`.
#[derive(Parser, Debug)]
struct Args {
    log_dir: PathBuf,
    log_file: String,
}

static IN_REPLY_TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^In-Reply-To:.*?<([^@>]+)@").unwrap());

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (ctx, _loaded) = bootstrap::bootstrap("ingestor").await?;

    let status = ingest(&ctx, &args.log_dir, &args.log_file).await?;
    info!(status = %status, "ingest complete");
    Ok(())
}

#[instrument(skip(ctx))]
async fn ingest(ctx: &coursework_core::CoreContext, log_dir: &std::path::Path, log_file: &str) -> anyhow::Result<String> {
    let log = read_session_log(log_dir, log_file).await?;
    if log.emails.is_empty() {
        return Ok("idle session".to_string());
    }

    let cover = &log.emails[0];
    let submission_id = mask_message_id(local_part(&cover.msg_id));
    let in_reply_to = read_in_reply_to(&ctx.config.patchset_root, &cover.msg_id).await;

    let submission = Submission {
        submission_id: submission_id.clone(),
        timestamp: log.timestamp,
        user: log.user.clone(),
        recipient: cover.recipient.clone(),
        email_count: log.emails.len() as i32,
        in_reply_to: in_reply_to.clone(),
        status: "pending".to_string(),
    };

    if let Err(err) = ctx.submissions.insert(&submission).await {
        warn!(%err, submission_id, "submission already ingested, treating as idempotent replay");
        return Ok("already ingested".to_string());
    }

    let status = dispatch(ctx, &log, &submission, in_reply_to.as_deref()).await?;
    ctx.submissions.set_status(&submission_id, &status).await?;
    Ok(status)
}

async fn dispatch(
    ctx: &coursework_core::CoreContext,
    log: &coursework_server::mailsession::MailSessionLog,
    submission: &Submission,
    in_reply_to: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(assignment) = ctx.assignments.get(&submission.recipient).await? {
        return Ok(dispatch_as_patchset(ctx, log, submission, &assignment).await?);
    }

    if let Some(reply_id) = in_reply_to {
        if let Some(orig) = ctx.gradeables.get_by_submission(reply_id).await? {
            return Ok(dispatch_as_peer_review(ctx, log, submission, &orig).await?);
        }
    }

    Ok("Not a recognized recipient".to_string())
}

async fn dispatch_as_patchset(
    ctx: &coursework_core::CoreContext,
    log: &coursework_server::mailsession::MailSessionLog,
    submission: &Submission,
    assignment: &coursework_model::Assignment,
) -> anyhow::Result<String> {
    if submission.email_count < 2 {
        return Ok("missing patches".to_string());
    }

    let stage = if log.timestamp < assignment.initial_due {
        Stage::Initial
    } else if log.timestamp < assignment.final_due {
        Stage::Final
    } else {
        return Ok(format!("{} past due", assignment.name));
    };

    let cover = &log.emails[0];
    let mut misaddressed = Vec::new();
    for (idx, email) in log.emails.iter().skip(1).enumerate() {
        if email.recipient != cover.recipient {
            misaddressed.push((idx + 1).to_string());
        }
    }
    if !misaddressed.is_empty() {
        return Ok(format!("patch(es) {} not addressed to {}", misaddressed.join(","), cover.recipient));
    }

    let patches: Vec<_> = log.emails[1..]
        .iter()
        .map(|e| coursework_contracts::validator::InboundEmail { recipient: e.recipient.clone(), msg_id: e.msg_id.clone() })
        .collect();
    let cover_email = coursework_contracts::validator::InboundEmail { recipient: cover.recipient.clone(), msg_id: cover.msg_id.clone() };

    let component = match stage {
        Stage::Initial => Component::Initial,
        Stage::Final => Component::Final,
        Stage::Peer => unreachable!("patchset stages are only initial or final"),
    };

    let feedback = ctx.validator.validate(&cover_email, &patches, &submission.submission_id, None).await?;
    ctx.gradeables
        .insert(&Gradeable {
            submission_id: submission.submission_id.clone(),
            timestamp: log.timestamp,
            user: log.user.clone(),
            assignment: assignment.name.clone(),
            component,
            auto_feedback: feedback,
        })
        .await?;

    Ok(format!("{}: {}", assignment.name, stage))
}

async fn dispatch_as_peer_review(
    ctx: &coursework_core::CoreContext,
    log: &coursework_server::mailsession::MailSessionLog,
    submission: &Submission,
    orig: &Gradeable,
) -> anyhow::Result<String> {
    let assignment = ctx
        .assignments
        .get(&orig.assignment)
        .await?
        .ok_or_else(|| anyhow::anyhow!("gradeable references unknown assignment {}", orig.assignment))?;

    if log.timestamp > assignment.peer_review_due {
        return Ok(format!("{} review past due", assignment.name));
    }

    let Some(pairing) = ctx.peer_review.get_for(&assignment.name, &log.user).await? else {
        return Ok("ineligible for peer review".to_string());
    };

    let component = if pairing.reviewee1.as_deref() == Some(submission.recipient.as_str()) {
        Component::Review1
    } else if pairing.reviewee2.as_deref() == Some(submission.recipient.as_str()) {
        Component::Review2
    } else {
        return Ok("reviewed wrong submission".to_string());
    };

    let reply_email = coursework_contracts::validator::InboundEmail {
        recipient: log.emails[0].recipient.clone(),
        msg_id: log.emails[0].msg_id.clone(),
    };
    let feedback = ctx.validator.apply_peer_review(&reply_email, &submission.submission_id, &orig.submission_id).await?;

    ctx.gradeables
        .insert(&Gradeable {
            submission_id: submission.submission_id.clone(),
            timestamp: log.timestamp,
            user: log.user.clone(),
            assignment: assignment.name.clone(),
            component,
            auto_feedback: feedback,
        })
        .await?;

    Ok(format!("{}: {}", assignment.name, component))
}

fn local_part(msg_id: &str) -> &str {
    msg_id.split('@').next().unwrap_or(msg_id)
}

async fn read_in_reply_to(patchset_root: &std::path::Path, msg_id: &str) -> Option<String> {
    let contents = tokio::fs::read_to_string(patchset_root.join(msg_id)).await.ok()?;
    let hex = IN_REPLY_TO.captures(&contents)?.get(1)?.as_str().to_string();
    Some(mask_message_id(&hex))
}
