// Static invite command, link and welcome image per the original bot.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const INVITE_URL: &str = "https://discord.gg/D48QWY6MhK";
const WELCOME_IMAGE: &str = "https://i.ibb.co/fn7VvQZ/welcome.gif";

/// Envia um link com convite para o servidor.
#[poise::command(slash_command, rename = "convite")]
pub async fn convite(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .color(serenity::Colour::from_rgb(47, 49, 54))
        .image(WELCOME_IMAGE);

    ctx.send(
        poise::CreateReply::default()
            .content(INVITE_URL)
            .embed(embed),
    )
    .await?;

    Ok(())
}
