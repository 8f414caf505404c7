//! Capture Source and Audio Cue collaborators. The camera stream is acquired
//! once at startup; acquisition failure is not retried and degrades to "no
//! live preview" (capture then refuses to grab a still).

use crate::browser;
use crate::wall::{PHOTO_HEIGHT, PHOTO_WIDTH};
use anyhow::{anyhow, Result};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioContext, HtmlVideoElement, MediaStream, MediaStreamConstraints, MediaStreamTrack};

// source resolution requested from the device; stills are downscaled to the
// card photo size on grab
const SOURCE_WIDTH: u32 = 1280;
const SOURCE_HEIGHT: u32 = 720;
const JPEG_QUALITY: f64 = 0.9;

#[derive(Serialize)]
struct VideoConstraints {
    width: u32,
    height: u32,
}

pub struct Camera {
    video: HtmlVideoElement,
    stream: Option<MediaStream>,
}

impl Camera {
    /// Attach the device camera to the preview element. A rejected
    /// getUserMedia is logged and leaves the preview blank; only a missing
    /// preview element is a real error.
    pub async fn acquire() -> Result<Self> {
        let video = browser::video()?;
        match Self::request_stream().await {
            Ok(stream) => {
                video.set_src_object(Some(&stream));
                Ok(Camera {
                    video,
                    stream: Some(stream),
                })
            }
            Err(err) => {
                log!("Error accessing camera : {:#?}", err);
                Ok(Camera {
                    video,
                    stream: None,
                })
            }
        }
    }

    async fn request_stream() -> Result<MediaStream> {
        let devices = browser::window()?
            .navigator()
            .media_devices()
            .map_err(|err| anyhow!("No media devices : {:#?}", err))?;
        let constraints = MediaStreamConstraints::new();
        let video_constraints = serde_wasm_bindgen::to_value(&VideoConstraints {
            width: SOURCE_WIDTH,
            height: SOURCE_HEIGHT,
        })
        .map_err(|err| anyhow!("error converting constraints : {:#?}", err))?;
        constraints.set_video(&video_constraints);

        let promise = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|err| anyhow!("getUserMedia unavailable : {:#?}", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| anyhow!("getUserMedia rejected : {:#?}", err))?
            .dyn_into::<MediaStream>()
            .map_err(|value| anyhow!("Error converting {:#?} to MediaStream", value))
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    pub fn video(&self) -> &HtmlVideoElement {
        &self.video
    }

    /// Freeze the current preview frame into a 300x400 JPEG data URL.
    pub fn grab_still(&self) -> Result<String> {
        if !self.is_live() {
            return Err(anyhow!("no live camera stream"));
        }
        let canvas = browser::create_offscreen_canvas(PHOTO_WIDTH as u32, PHOTO_HEIGHT as u32)?;
        let context = browser::context_of(&canvas)?;
        context
            .draw_image_with_html_video_element_and_dw_and_dh(
                &self.video,
                0.0,
                0.0,
                PHOTO_WIDTH.into(),
                PHOTO_HEIGHT.into(),
            )
            .map_err(|err| anyhow!("Error freezing video frame : {:#?}", err))?;
        canvas
            .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(JPEG_QUALITY))
            .map_err(|err| anyhow!("Error encoding still : {:#?}", err))
    }

    /// Releases the device when the page goes away. The page owns the app
    /// for its whole lifetime, so this is the stream's only release path.
    pub fn release_on_pagehide(&self) -> Result<()> {
        let Some(stream) = self.stream.clone() else {
            return Ok(());
        };
        let closure = browser::closure_once(move || stop_tracks(&stream));
        browser::window()?
            .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("Cannot attach pagehide listener : {:#?}", err))?;
        closure.forget();
        Ok(())
    }
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}

// ==================== Shutter tone ====================

const TONE_HZ: f32 = 400.0;
const TONE_SECONDS: f64 = 0.1;
const TONE_GAIN: f32 = 0.3;

/// A brief synthesized click. Fire-and-forget : audio failure is logged and
/// never blocks the capture.
pub struct Shutter;

impl Shutter {
    pub fn click(&self) {
        if let Err(err) = self.tone() {
            log!("Error playing shutter tone : {:#?}", err);
        }
    }

    fn tone(&self) -> Result<()> {
        let context =
            AudioContext::new().map_err(|err| anyhow!("No audio context : {:#?}", err))?;
        let oscillator = context
            .create_oscillator()
            .map_err(|err| anyhow!("Error creating oscillator : {:#?}", err))?;
        let gain = context
            .create_gain()
            .map_err(|err| anyhow!("Error creating gain node : {:#?}", err))?;

        oscillator
            .connect_with_audio_node(&gain)
            .map_err(|err| anyhow!("Error connecting oscillator : {:#?}", err))?;
        gain.connect_with_audio_node(&context.destination())
            .map_err(|err| anyhow!("Error connecting gain : {:#?}", err))?;

        oscillator.frequency().set_value(TONE_HZ);
        let now = context.current_time();
        gain.gain()
            .set_value_at_time(TONE_GAIN, now)
            .map_err(|err| anyhow!("Error shaping tone : {:#?}", err))?;
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, now + TONE_SECONDS)
            .map_err(|err| anyhow!("Error shaping tone : {:#?}", err))?;

        oscillator
            .start()
            .map_err(|err| anyhow!("Error starting tone : {:#?}", err))?;
        oscillator
            .stop_with_when(now + TONE_SECONDS)
            .map_err(|err| anyhow!("Error stopping tone : {:#?}", err))?;
        Ok(())
    }
}
