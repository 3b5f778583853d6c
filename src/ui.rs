//! The tone slider and its text display.
//!
//! Natively the slider is driven by the keyboard (arrow keys step, digit keys
//! jump) and its text is shown in the window title. In the browser it binds to
//! an `<input type="range">` and a text element on the page.

use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{context::SliderConfig, coordinator::ToneCoordinator, data_structures::tone::ToneKey};

#[derive(Clone, Debug, PartialEq)]
pub struct ToneSlider {
    min: i32,
    max: i32,
    value: i32,
    scale: f64,
}

impl ToneSlider {
    pub fn new(config: &SliderConfig) -> Self {
        let (min, max) = (config.min.min(config.max), config.max.max(config.min));
        Self {
            min,
            max,
            value: config.initial.clamp(min, max),
            scale: config.scale,
        }
    }

    /// Moves the slider to `value`, clamped to its bounds. Returns `true` if it moved.
    pub fn set(&mut self, value: i32) -> bool {
        let value = value.clamp(self.min, self.max);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    pub fn step(&mut self, delta: i32) -> bool {
        self.set(self.value.saturating_add(delta))
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    pub fn key(&self) -> ToneKey {
        ToneKey::quantize(self.value as f64, self.scale)
    }

    pub fn display_text(&self) -> String {
        format!("Tone {}", self.key())
    }

    /// `display_text`, plus the load progress while the tones are still arriving.
    pub fn status_text(&self, coordinator: &ToneCoordinator) -> String {
        if coordinator.is_ready() {
            self.display_text()
        } else {
            let (loaded, expected) = coordinator.progress();
            format!("{} | loading {}/{}", self.display_text(), loaded, expected)
        }
    }

    /// Maps a pressed key onto the slider. Returns `true` if the value changed.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed {
            return false;
        }
        match event.physical_key {
            PhysicalKey::Code(code) => self.handle_key_code(code),
            PhysicalKey::Unidentified(_) => false,
        }
    }

    pub fn handle_key_code(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::ArrowLeft | KeyCode::ArrowDown => self.step(-1),
            KeyCode::ArrowRight | KeyCode::ArrowUp => self.step(1),
            KeyCode::Home => self.set(self.min),
            KeyCode::End => self.set(self.max),
            code => match digit(code) {
                Some(value) => self.set(value),
                None => false,
            },
        }
    }
}

fn digit(code: KeyCode) -> Option<i32> {
    let value = match code {
        KeyCode::Digit0 | KeyCode::Numpad0 => 0,
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        _ => return None,
    };
    Some(value)
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomSlider;

#[cfg(target_arch = "wasm32")]
mod dom {
    use anyhow::Context;
    use wasm_bindgen::{JsCast, closure::Closure};
    use web_sys::{Element, HtmlInputElement};

    use super::ToneSlider;

    /// Page elements backing the slider: the range input and the text display.
    pub struct DomSlider {
        input: HtmlInputElement,
        display: Option<Element>,
    }

    impl DomSlider {
        /// Looks up both elements, syncs them with `slider` and calls `on_change`
        /// with the parsed value on every `input` event.
        pub fn bind(
            slider: &ToneSlider,
            input_id: &str,
            display_id: &str,
            mut on_change: impl FnMut(i32) + 'static,
        ) -> anyhow::Result<Self> {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .context("No document to bind the tone slider to")?;
            let input = document
                .get_element_by_id(input_id)
                .with_context(|| format!("No element with id {}", input_id))?
                .dyn_into::<HtmlInputElement>()
                .map_err(|_| anyhow::anyhow!("Element {} is not an <input>", input_id))?;
            let display = document.get_element_by_id(display_id);
            if display.is_none() {
                log::warn!("No element with id {}, the tone will not be displayed", display_id);
            }

            let (min, max) = slider.bounds();
            input.set_min(&min.to_string());
            input.set_max(&max.to_string());
            input.set_value(&slider.value().to_string());

            let source = input.clone();
            let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                match source.value().parse::<f64>() {
                    Ok(value) => on_change(value.round() as i32),
                    Err(e) => log::warn!("Ignoring slider value {:?}: {}", source.value(), e),
                }
            });
            input
                .add_event_listener_with_callback("input", listener.as_ref().unchecked_ref())
                .map_err(|e| anyhow::anyhow!("Could not listen to slider input: {:?}", e))?;
            // the listener lives as long as the page
            listener.forget();

            let dom = Self { input, display };
            dom.show(slider, &slider.display_text());
            Ok(dom)
        }

        pub fn show(&self, slider: &ToneSlider, text: &str) {
            self.input.set_value(&slider.value().to_string());
            if let Some(display) = &self.display {
                display.set_text_content(Some(text));
            }
        }
    }
}
