// Discord command for reaction giveaways.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - the exactly-once draw logic lives in the core
// GiveawaySession; this file only renders it and wires up the buttons.

use crate::core::giveaway::{GiveawayError, GiveawayOutcome, GiveawaySession};
use crate::core::pruning::WebhookPruner;
use crate::infra::giveaway::SerenityReactionTally;
use crate::infra::pruning::SerenityMessageDeleter;
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// How often the deadline path retries a failing reaction read before it
/// gives up and closes the giveaway without a draw.
const EXPIRY_TALLY_ATTEMPTS: u32 = 3;
const EXPIRY_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Inicia um sorteio: reaja com o emoji para participar.
#[poise::command(slash_command, guild_only)]
pub async fn giveaway(
    ctx: Context<'_>,
    #[description = "Nome do prêmio"] nome: String,
    #[description = "Duração em segundos (5 a 300)"] duracao: u64,
    #[description = "Emoji de participação"] emoji: String,
) -> Result<(), Error> {
    let starter = ctx.author().id.get();

    let session = match GiveawaySession::start(starter, duracao) {
        Ok(session) => session,
        Err(err) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(error_text(&err))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let reaction = match serenity::ReactionType::try_from(emoji.trim()) {
        Ok(reaction) => reaction,
        Err(_) => {
            ctx.send(
                poise::CreateReply::default()
                    .content("Esse emoji não parece válido.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let controls = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("giveaway_draw")
            .label("Sortear")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new("giveaway_cancel")
            .label("Cancelar")
            .style(serenity::ButtonStyle::Danger),
    ])];

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(open_embed(&nome, &emoji, duracao))
                .components(controls),
        )
        .await?;
    let mut msg = reply.message().await?.into_owned();

    // Seed the reaction so entrants only have to click it. "Emoji must be
    // postable" is validated right here: if the react fails, the giveaway
    // never really starts.
    if let Err(err) = msg.react(&ctx, reaction.clone()).await {
        tracing::warn!(%err, "failed to seed giveaway reaction");
        let _ = session.request_cancel(starter);
        msg.edit(
            &ctx,
            serenity::EditMessage::new()
                .embed(result_embed(
                    &nome,
                    "Sorteio cancelado: não consegui usar esse emoji.",
                    0x99aab5,
                ))
                .components(vec![]),
        )
        .await?;
        return Ok(());
    }

    let tally = SerenityReactionTally::new(
        ctx.serenity_context().http.clone(),
        msg.channel_id,
        msg.id,
        reaction,
    );

    let deadline = Instant::now() + session.duration();
    let msg_id = msg.id;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            expire(ctx, &session, &tally, &nome, &mut msg).await;
            break;
        }

        let interaction = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(ctx.channel_id())
            .timeout(remaining)
            .filter(move |mci| mci.message.id == msg_id)
            .await;

        let Some(mci) = interaction else {
            // No clicks before the deadline.
            expire(ctx, &session, &tally, &nome, &mut msg).await;
            break;
        };

        let actor = mci.user.id.get();
        match mci.data.custom_id.as_str() {
            "giveaway_draw" => {
                let mut rng = StdRng::from_entropy();
                match session.request_draw(actor, &tally, &mut rng).await {
                    Ok(outcome) => {
                        tracing::info!(
                            starter,
                            status = ?session.status(),
                            ?outcome,
                            "giveaway drawn manually"
                        );
                        finish_via_interaction(ctx, &mci, &nome, &outcome).await;
                        break;
                    }
                    Err(err @ GiveawayError::TallyError(_)) => {
                        // Recoverable: the session is still open, the starter
                        // can simply click again.
                        tracing::warn!(%err, "failed to read giveaway reactions");
                        notify_ephemeral(
                            ctx,
                            &mci,
                            "Não consegui ler as reações agora. Tente de novo.",
                        )
                        .await;
                    }
                    Err(err) => notify_ephemeral(ctx, &mci, &error_text(&err)).await,
                }
            }
            "giveaway_cancel" => match session.request_cancel(actor) {
                Ok(()) => {
                    tracing::info!(starter, status = ?session.status(), "giveaway cancelled");
                    update_via_interaction(
                        ctx,
                        &mci,
                        result_embed(&nome, "Sorteio cancelado.", 0x99aab5),
                    )
                    .await;
                    break;
                }
                Err(err) => notify_ephemeral(ctx, &mci, &error_text(&err)).await,
            },
            _ => {}
        }
    }

    Ok(())
}

/// Deadline path: same draw logic, `Expired` terminal tag. A `None` means a
/// manual action won the race and already rendered the result.
///
/// The tally read gets a few attempts; once the collector loop exits nothing
/// else will, so if the tally never answers the session is force-expired and
/// the message still reaches a terminal state with its buttons removed.
async fn expire(
    ctx: Context<'_>,
    session: &GiveawaySession,
    tally: &SerenityReactionTally,
    nome: &str,
    msg: &mut serenity::Message,
) {
    for attempt in 1..=EXPIRY_TALLY_ATTEMPTS {
        let mut rng = StdRng::from_entropy();
        match session.on_deadline_elapsed(tally, &mut rng).await {
            Ok(Some(outcome)) => {
                tracing::info!(status = ?session.status(), ?outcome, "giveaway expired");
                let (text, color) = outcome_text(nome, &outcome);
                edit_to_terminal(ctx, msg, result_embed(nome, &text, color)).await;
                return;
            }
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(%err, attempt, "giveaway expiry draw failed");
                if attempt < EXPIRY_TALLY_ATTEMPTS {
                    tokio::time::sleep(EXPIRY_RETRY_DELAY).await;
                }
            }
        }
    }

    if session.force_expire().is_ok() {
        tracing::warn!("giveaway reactions stayed unreadable, closing without a draw");
        edit_to_terminal(
            ctx,
            msg,
            result_embed(
                nome,
                &format!(
                    "Não consegui ler as reações e o sorteio de **{nome}** \
                     foi encerrado sem vencedor."
                ),
                0x99aab5,
            ),
        )
        .await;
    }
}

async fn edit_to_terminal(ctx: Context<'_>, msg: &mut serenity::Message, embed: serenity::CreateEmbed) {
    if let Err(err) = msg
        .edit(
            &ctx,
            serenity::EditMessage::new().embed(embed).components(vec![]),
        )
        .await
    {
        tracing::warn!(%err, "failed to announce giveaway result");
    }
}

async fn finish_via_interaction(
    ctx: Context<'_>,
    mci: &serenity::ComponentInteraction,
    nome: &str,
    outcome: &GiveawayOutcome,
) {
    let (text, color) = outcome_text(nome, outcome);
    update_via_interaction(ctx, mci, result_embed(nome, &text, color)).await;
}

/// Replace the giveaway message with its final form and drop the buttons.
async fn update_via_interaction(
    ctx: Context<'_>,
    mci: &serenity::ComponentInteraction,
    embed: serenity::CreateEmbed,
) {
    let response = serenity::CreateInteractionResponse::UpdateMessage(
        serenity::CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(vec![]),
    );
    if let Err(err) = mci.create_response(ctx.serenity_context(), response).await {
        tracing::warn!(%err, "failed to update giveaway message");
    }
}

async fn notify_ephemeral(ctx: Context<'_>, mci: &serenity::ComponentInteraction, text: &str) {
    let response = serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    );
    if let Err(err) = mci.create_response(ctx.serenity_context(), response).await {
        tracing::warn!(%err, "failed to send ephemeral notice");
    }
}

fn open_embed(nome: &str, emoji: &str, duracao: u64) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("🎉 {nome}"))
        .description(format!(
            "Reaja com {emoji} para participar!\nO sorteio termina em **{duracao}** segundos."
        ))
        .color(0xffd700)
}

fn result_embed(nome: &str, text: &str, color: u32) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("🎉 {nome}"))
        .description(text.to_string())
        .color(color)
}

fn outcome_text(nome: &str, outcome: &GiveawayOutcome) -> (String, u32) {
    match outcome {
        GiveawayOutcome::Winner(user_id) => (
            format!("<@{user_id}> venceu o sorteio de **{nome}**! 🎉"),
            0x00ff00,
        ),
        GiveawayOutcome::NoParticipants => {
            (format!("Ninguém participou do sorteio de **{nome}**."), 0x99aab5)
        }
    }
}

fn error_text(err: &GiveawayError) -> String {
    match err {
        GiveawayError::DurationOutOfRange => {
            "A duração deve ficar entre 5 e 300 segundos.".to_string()
        }
        GiveawayError::NotAuthorized => {
            "Somente quem iniciou o sorteio pode usar esses botões.".to_string()
        }
        GiveawayError::AlreadyFinished => "Este sorteio já terminou.".to_string(),
        GiveawayError::TallyError(_) => {
            "Não consegui ler as reações agora. Tente de novo.".to_string()
        }
    }
}

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
use std::sync::Arc;

pub struct Data {
    pub pruner: Arc<WebhookPruner>,
    pub deleter: Arc<SerenityMessageDeleter>,
    pub prune_channel_id: u64,
}
