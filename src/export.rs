//! Export Adapter : rasterizes one card to an offscreen canvas at 2x scale
//! and hands the result to the browser as a file download. Export failure is
//! never fatal to the wall; a card whose still has not finished decoding is
//! skipped.

use crate::browser;
use crate::wall::card::PhotoCard;
use crate::wall::{CAPTION_STRIP, CARD_HEIGHT, CARD_PADDING, CARD_WIDTH, PHOTO_HEIGHT, PHOTO_WIDTH};
use anyhow::{anyhow, Result};
use web_sys::HtmlImageElement;

const SCALE: f64 = 2.0;

pub fn filename(card: &PhotoCard) -> String {
    format!("retro-photo-{}.png", card.id())
}

/// Draw the card the way the wall shows it - white frame, photo, date line,
/// caption - and trigger a download. A missing decoded still abandons the
/// export without raising.
pub fn download_card(card: &PhotoCard, still: Option<&HtmlImageElement>) -> Result<()> {
    let Some(image) = still else {
        log!("export : still for card {} not decoded yet, skipping", card.id());
        return Ok(());
    };

    let canvas = browser::create_offscreen_canvas(
        (f64::from(CARD_WIDTH) * SCALE) as u32,
        (f64::from(CARD_HEIGHT) * SCALE) as u32,
    )?;
    let context = browser::context_of(&canvas)?;
    context
        .scale(SCALE, SCALE)
        .map_err(|err| anyhow!("Error scaling export canvas : {:#?}", err))?;

    // card frame
    context.set_fill_style_str("#ffffff");
    context.fill_rect(0.0, 0.0, CARD_WIDTH.into(), CARD_HEIGHT.into());

    // photo backing + still
    context.set_fill_style_str("#e5e7eb");
    context.fill_rect(
        CARD_PADDING.into(),
        CARD_PADDING.into(),
        PHOTO_WIDTH.into(),
        PHOTO_HEIGHT.into(),
    );
    context
        .draw_image_with_html_image_element_and_dw_and_dh(
            image,
            CARD_PADDING.into(),
            CARD_PADDING.into(),
            PHOTO_WIDTH.into(),
            PHOTO_HEIGHT.into(),
        )
        .map_err(|err| anyhow!("Error drawing still : {:#?}", err))?;

    // date + caption, centered like the on-screen card
    let center_x = f64::from(CARD_WIDTH) * 0.5;
    let strip_top = f64::from(CARD_HEIGHT - CARD_PADDING - CAPTION_STRIP);
    context.set_text_align("center");
    context.set_text_baseline("middle");
    context.set_fill_style_str("#4b5563");
    context.set_font("14px sans-serif");
    context
        .fill_text(card.date(), center_x, strip_top + 14.0)
        .map_err(|err| anyhow!("Error drawing date : {:#?}", err))?;
    context.set_fill_style_str("#1f2937");
    context.set_font("500 18px sans-serif");
    context
        .fill_text(card.caption(), center_x, strip_top + 42.0)
        .map_err(|err| anyhow!("Error drawing caption : {:#?}", err))?;

    let href = canvas
        .to_data_url()
        .map_err(|err| anyhow!("Error encoding export : {:#?}", err))?;
    browser::download(&href, &filename(card))
}
