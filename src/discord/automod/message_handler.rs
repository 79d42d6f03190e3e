// Translates gateway messages into core messages and runs the automod pipeline.
//
// This layer is thin: extract primitive data, call the core service, log.

use crate::core::automod::{Author, Evaluation, Message};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Convert a guild message. `None` for DMs.
pub fn to_core_message(msg: &serenity::Message) -> Option<Message> {
    let guild_id = msg.guild_id?.get();

    let roles: Vec<u64> = msg
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default();

    Some(Message {
        id: msg.id.get(),
        guild_id,
        channel_id: msg.channel_id.get(),
        author: Author {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            roles,
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
        mentioned_users: msg.mentions.iter().map(|user| user.id.get()).collect(),
        mentioned_roles: msg.mention_roles.iter().map(|role| role.get()).collect(),
    })
}

/// Convert a raw edit payload, for edits whose message was not cached.
///
/// The gateway only sends the fields that changed, so an edit without
/// content (an embed resolving, a pin) gives `None`.
pub fn edit_to_core_message(event: &serenity::MessageUpdateEvent) -> Option<Message> {
    let guild_id = event.guild_id?.get();
    let author = event.author.as_ref()?;
    let content = event.content.clone()?;

    let roles: Vec<u64> = event
        .member
        .as_ref()
        .and_then(|member| member.as_deref())
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default();

    Some(Message {
        id: event.id.get(),
        guild_id,
        channel_id: event.channel_id.get(),
        author: Author {
            id: author.id.get(),
            name: author.name.clone(),
            roles,
            bot: author.bot,
        },
        content,
        mentioned_users: event
            .mentions
            .iter()
            .flatten()
            .map(|user| user.id.get())
            .collect(),
        mentioned_roles: event
            .mention_roles
            .iter()
            .flatten()
            .map(|role| role.get())
            .collect(),
    })
}

fn log_evaluation(message: &Message, evaluation: &Evaluation) {
    match evaluation {
        Evaluation::Ignored(reason) => {
            tracing::trace!(message_id = message.id, ?reason, "Automod skipped message");
        }
        Evaluation::Halted { rule, .. } => {
            tracing::debug!(
                message_id = message.id,
                rule = rule.rule_name(),
                offenses = evaluation.reports().len(),
                "Automod evaluation halted"
            );
        }
        Evaluation::Evaluated { .. } => {
            let offenses = evaluation.reports().len();
            if offenses > 0 {
                tracing::debug!(message_id = message.id, offenses, "Automod evaluation finished");
            }
        }
    }
}

pub async fn handle_new_message(data: &Data, msg: &serenity::Message) -> Result<(), Error> {
    let Some(message) = to_core_message(msg) else {
        return Ok(());
    };

    let evaluation = data.automod.handle_message(&message).await;
    log_evaluation(&message, &evaluation);
    Ok(())
}

/// Edits are evaluated against the new content only.
///
/// `after` is the cached message with the edit applied. Without it the raw
/// payload is used.
pub async fn handle_edited_message(
    data: &Data,
    after: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<(), Error> {
    let message = match after {
        Some(after) => to_core_message(after),
        None => edit_to_core_message(event),
    };
    let Some(message) = message else {
        tracing::trace!(message_id = event.id.get(), "Edit carried no content to evaluate");
        return Ok(());
    };

    let evaluation = data.automod.handle_message_edit(&message).await;
    log_evaluation(&message, &evaluation);
    Ok(())
}
