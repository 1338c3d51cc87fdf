// Discord command for reaction polls: one message, one reaction per option.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Regional indicator letters 🇦..🇹 - one per option, up to the 20-reaction
/// limit Discord puts on a message.
const OPTION_EMOJIS: [&str; 20] = [
    "🇦", "🇧", "🇨", "🇩", "🇪", "🇫", "🇬", "🇭", "🇮", "🇯", "🇰", "🇱", "🇲", "🇳", "🇴", "🇵",
    "🇶", "🇷", "🇸", "🇹",
];

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 20;

/// Split the comma-separated option list, dropping empty entries.
fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect()
}

/// Cria uma enquete: vote reagindo com a letra da opção.
#[poise::command(slash_command)]
pub async fn poll(
    ctx: Context<'_>,
    #[description = "Pergunta da enquete"] pergunta: String,
    #[description = "Opções separadas por vírgula"] opcoes: String,
) -> Result<(), Error> {
    let options = parse_options(&opcoes);

    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "A enquete precisa de {MIN_OPTIONS} a {MAX_OPTIONS} opções não vazias, separadas por vírgula."
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let description = options
        .iter()
        .zip(OPTION_EMOJIS.iter())
        .map(|(option, emoji)| format!("{emoji} {option}"))
        .collect::<Vec<_>>()
        .join("\n");

    let embed = serenity::CreateEmbed::new()
        .title(format!("📊 {pergunta}"))
        .description(description)
        .color(0x5865f2);

    let reply = ctx.send(poise::CreateReply::default().embed(embed)).await?;
    let msg = reply.message().await?;

    // One reaction per option. A failed reaction shouldn't kill the poll -
    // log it and keep going with the rest.
    for emoji in OPTION_EMOJIS.iter().take(options.len()) {
        if let Err(err) = msg
            .react(&ctx, serenity::ReactionType::Unicode(emoji.to_string()))
            .await
        {
            tracing::warn!(%err, emoji, "failed to add poll reaction");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_trimmed_and_empties_dropped() {
        let options = parse_options(" sim , não ,, talvez ,");
        assert_eq!(options, vec!["sim", "não", "talvez"]);
    }

    #[test]
    fn option_count_limits_match_the_emoji_table() {
        assert_eq!(OPTION_EMOJIS.len(), MAX_OPTIONS);
    }
}
