//! `doppel export`: dump stored feedback and conversations as markdown.
//!
//! Unanswered questions come first; they are the gaps to fill in the corpus.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use doppel_core::{FeedbackKind, PersistenceError, TranscriptRecord};
use doppel_store::{ConversationSummary, Store, StoredFeedback};

pub async fn run(
    config_path: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = doppel_store::open(&config.store).await?;

    let export = collect(store.as_ref()).await?;
    let markdown = render(&export, chrono::Utc::now());

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, markdown)?;
            eprintln!(
                "Exported {} feedback entries and {} conversations to {}",
                export.feedback.len(),
                export.conversations.len(),
                path.display()
            );
        }
        None => print!("{markdown}"),
    }

    Ok(())
}

struct Export {
    feedback: Vec<StoredFeedback>,
    conversations: Vec<(ConversationSummary, Vec<TranscriptRecord>)>,
}

async fn collect(store: &dyn Store) -> Result<Export, PersistenceError> {
    let feedback = store.list_feedback().await?;
    let mut conversations = Vec::new();
    for summary in store.conversations().await? {
        let transcript = store.transcript(&summary.id).await?;
        conversations.push((summary, transcript));
    }
    Ok(Export {
        feedback,
        conversations,
    })
}

fn render(export: &Export, generated_at: chrono::DateTime<chrono::Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Doppel export");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    let (unanswered, other): (Vec<&StoredFeedback>, Vec<&StoredFeedback>) = export
        .feedback
        .iter()
        .partition(|f| f.record.kind == FeedbackKind::Unanswered);

    let _ = writeln!(out, "## Unanswered questions ({})", unanswered.len());
    let _ = writeln!(out);
    if unanswered.is_empty() {
        let _ = writeln!(out, "_None._");
    }
    for entry in &unanswered {
        let _ = writeln!(out, "- {}", one_line(&entry.record.user_message));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Feedback ({})", other.len());
    let _ = writeln!(out);
    if other.is_empty() {
        let _ = writeln!(out, "_None._");
        let _ = writeln!(out);
    }
    for entry in &other {
        let record = &entry.record;
        let rating = record.rating.map(|r| r.as_str()).unwrap_or("none");
        let _ = writeln!(
            out,
            "### #{} {} ({rating}), {}",
            entry.id,
            record.kind.as_str(),
            record.at.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "> **Q:** {}", one_line(&record.user_message));
        if let Some(response) = &record.assistant_response {
            let _ = writeln!(out, ">");
            let _ = writeln!(out, "> **A:** {}", one_line(response));
        }
        if let Some(notes) = &record.notes {
            let _ = writeln!(out);
            let _ = writeln!(out, "Notes: {}", one_line(notes));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Conversations ({})", export.conversations.len());
    let _ = writeln!(out);
    for (summary, transcript) in &export.conversations {
        let _ = writeln!(
            out,
            "### {} ({} messages, {})",
            summary.id,
            summary.message_count,
            summary.started_at.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(out);
        for turn in transcript {
            let _ = writeln!(out, "- **{}:** {}", turn.role, one_line(&turn.text));
        }
        let _ = writeln!(out);
    }

    out
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use doppel_core::{EventSink, FeedbackRecord, Rating, Role};
    use doppel_store::InMemoryStore;

    fn feedback(kind: FeedbackKind, message: &str) -> FeedbackRecord {
        FeedbackRecord {
            conversation_id: Some("conv-1".into()),
            user_message: message.into(),
            assistant_response: Some("I'm not sure!\nMaybe ask him.".into()),
            kind,
            rating: Some(Rating::Negative),
            notes: None,
            at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn export_groups_unanswered_first() {
        let store = InMemoryStore::new();
        store
            .record_feedback(feedback(FeedbackKind::Unanswered, "Favorite movie?"))
            .await
            .unwrap();
        store
            .record_feedback(feedback(FeedbackKind::Inaccurate, "Where did he study?"))
            .await
            .unwrap();
        store
            .record_turn(TranscriptRecord::now("conv-1", Role::User, "hi"))
            .await
            .unwrap();
        store
            .record_turn(TranscriptRecord::now("conv-1", Role::Assistant, "Hey there!"))
            .await
            .unwrap();

        let export = collect(&store).await.unwrap();
        let generated = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 0).unwrap();
        let md = render(&export, generated);

        assert!(md.contains("Generated 2026-01-02 03:04 UTC"));
        assert!(md.contains("## Unanswered questions (1)\n\n- Favorite movie?"));
        assert!(md.contains("## Feedback (1)"));
        assert!(md.contains("inaccurate (negative)"));
        assert!(md.contains("> **A:** I'm not sure! Maybe ask him."));
        assert!(md.contains("### conv-1 (2 messages"));
        assert!(md.contains("- **user:** hi"));
        assert!(md.contains("- **assistant:** Hey there!"));

        let unanswered_at = md.find("## Unanswered").unwrap();
        let feedback_at = md.find("## Feedback").unwrap();
        assert!(unanswered_at < feedback_at);
    }

    #[tokio::test]
    async fn empty_store_exports_placeholders() {
        let store = InMemoryStore::new();
        let export = collect(&store).await.unwrap();
        let md = render(&export, chrono::Utc::now());
        assert!(md.contains("## Unanswered questions (0)\n\n_None._"));
        assert!(md.contains("## Conversations (0)"));
    }
}
