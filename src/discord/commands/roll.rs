// Discord command for dice rolling.
//
// Parsing, evaluation and the re-roll gate live in the core dice module;
// this file renders the result and drives the "roll again" button.

use crate::core::dice::{CritOutcome, DiceError, DiceExpression, RollControl, RollResult};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

const CRIT_HIT_IMAGE: &str = "https://i.ibb.co/wyQPZcT/success.gif";
const CRIT_MISS_IMAGE: &str = "https://i.ibb.co/N9wwKW8/fail.gif";

/// Rola dados no formato NdM (ex.: 2d6).
#[poise::command(slash_command)]
pub async fn roll(
    ctx: Context<'_>,
    #[description = "Notação dos dados, ex.: 2d6"] dados: String,
) -> Result<(), Error> {
    let expression = match DiceExpression::parse(&dados) {
        Ok(expression) => expression,
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

    let roller = ctx.author().id.get();
    let mut rng = StdRng::from_entropy();
    let result = expression.evaluate(&mut rng);

    let control = RollControl::new(roller, expression, Instant::now());

    let components = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("reroll")
            .label("Rolar novamente")
            .style(serenity::ButtonStyle::Secondary),
    ])];

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(roll_embed(roller, &result))
                .components(components),
        )
        .await?;
    let msg_id = reply.message().await?.id;

    // Same pattern as other interactive messages: collect button presses
    // until the control's window closes.
    loop {
        let remaining = control.deadline().saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let interaction = serenity::ComponentInteractionCollector::new(ctx)
            .channel_id(ctx.channel_id())
            .timeout(remaining)
            .filter(move |mci| mci.message.id == msg_id && mci.data.custom_id == "reroll")
            .await;

        let Some(mci) = interaction else {
            break;
        };

        let mut rng = StdRng::from_entropy();
        match control.reroll(mci.user.id.get(), Instant::now(), &mut rng) {
            Ok(new_result) => {
                let response = serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(roll_embed(roller, &new_result)),
                );
                if let Err(err) = mci.create_response(ctx.serenity_context(), response).await {
                    tracing::warn!(%err, "failed to update roll message");
                }
            }
            Err(err) => {
                let response = serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .content(error_text(&err))
                        .ephemeral(true),
                );
                if let Err(err) = mci.create_response(ctx.serenity_context(), response).await {
                    tracing::warn!(%err, "failed to send ephemeral notice");
                }
            }
        }
    }

    Ok(())
}

fn roll_embed(roller: u64, result: &RollResult) -> serenity::CreateEmbed {
    let expression = result.expression;
    let mut embed = serenity::CreateEmbed::new().author(serenity::CreateEmbedAuthor::new(
        format!("{}d{} 🎲", expression.count(), expression.faces()),
    ));

    // A single d20 keeps the original bot's crit styling.
    embed = match result.crit() {
        Some(CritOutcome::Hit) => embed
            .color(serenity::Colour::from_rgb(0, 255, 0))
            .field("**ACERTO CRÍTICO!**", " ", false)
            .image(CRIT_HIT_IMAGE),
        Some(CritOutcome::Miss) => embed
            .color(serenity::Colour::from_rgb(255, 0, 0))
            .field("**FALHA CRÍTICA!**", " ", false)
            .image(CRIT_MISS_IMAGE),
        None => embed.color(serenity::Colour::from_rgb(0, 0, 255)),
    };

    let line = if result.rolls.len() == 1 {
        format!("**<@{roller}>** rolou um **{}**", result.total)
    } else {
        let rolls = result
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "**<@{roller}>** rolou {} (total **{}**)",
            rolls, result.total
        )
    };

    embed.field(" ", line, false)
}

fn error_text(err: &DiceError) -> String {
    match err {
        DiceError::InvalidFormat => "Formato inválido. Use algo como `2d6`.".to_string(),
        DiceError::OutOfRange => {
            "Valores fora do limite: de 1 a 100 dados, com 2 a 1000 lados.".to_string()
        }
        DiceError::NotAuthorized => "Somente quem rolou pode rolar novamente.".to_string(),
        DiceError::WindowClosed => "O tempo para rolar novamente acabou.".to_string(),
    }
}
