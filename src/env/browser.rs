//! DOM-backed environment for wasm32 browser builds.

use super::{
    close_on_error, AudioGraph, AudioGraphSpec, Canvas2d, EnvironmentProbe, GlParameter,
    NavigatorInfo, ProbeFuture, ScreenInfo, WebGlSurface, Waveform,
};
use crate::error::ProbeError;
use js_sys::{Array, Object, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::oneshot;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AnalyserNode, AudioContext, AudioProcessingEvent, CanvasRenderingContext2d, Document,
    GainNode, HtmlCanvasElement, OscillatorNode, OscillatorType, ScriptProcessorNode,
    WebGlRenderingContext as Gl, Window,
};

// WEBGL_debug_renderer_info
const UNMASKED_VENDOR_WEBGL: u32 = 0x9245;
const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

fn js_failure(context: &str, err: JsValue) -> ProbeError {
    let detail = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    ProbeError::Failed(format!("{context}: {detail}"))
}

/// The page's window and document.
pub struct BrowserEnvironment {
    window: Window,
    document: Document,
}

impl BrowserEnvironment {
    /// `None` when there is no window or document (workers, non-browser hosts).
    pub fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self { window, document })
    }

    fn create_canvas(&self, width: u32, height: u32) -> Result<HtmlCanvasElement, ProbeError> {
        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(|e| js_failure("createElement", e))?
            .dyn_into()
            .map_err(|_| ProbeError::Unavailable("canvas"))?;
        canvas.set_width(width);
        canvas.set_height(height);
        Ok(canvas)
    }
}

impl EnvironmentProbe for BrowserEnvironment {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, ProbeError> {
        let canvas = self.create_canvas(width, height)?;
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| js_failure("getContext(2d)", e))?
            .ok_or(ProbeError::Unavailable("canvas"))?
            .dyn_into()
            .map_err(|_| ProbeError::Unavailable("canvas"))?;
        Ok(Box::new(DomCanvas { canvas, context }))
    }

    fn webgl(&self) -> Result<Box<dyn WebGlSurface>, ProbeError> {
        let canvas = self.create_canvas(1, 1)?;
        let context = canvas
            .get_context("webgl")
            .ok()
            .flatten()
            .or_else(|| canvas.get_context("experimental-webgl").ok().flatten())
            .ok_or(ProbeError::Unavailable("webgl"))?;
        let gl: Gl = context
            .dyn_into()
            .map_err(|_| ProbeError::Unavailable("webgl"))?;
        // Unmasked parameters only resolve once the extension is enabled
        let debug_renderer_info = matches!(gl.get_extension("WEBGL_debug_renderer_info"), Ok(Some(_)));
        Ok(Box::new(DomWebGl {
            canvas,
            gl,
            debug_renderer_info,
        }))
    }

    fn audio_graph(&self, spec: &AudioGraphSpec) -> Result<Box<dyn AudioGraph>, ProbeError> {
        DomAudioGraph::build(spec).map(|graph| Box::new(graph) as Box<dyn AudioGraph>)
    }

    fn navigator(&self) -> Result<NavigatorInfo, ProbeError> {
        let navigator = self.window.navigator();
        let defaults = NavigatorInfo::default();

        let plugins = navigator
            .plugins()
            .map(|list| {
                (0..list.length())
                    .filter_map(|i| list.item(i))
                    .map(|plugin| plugin.name())
                    .collect()
            })
            .unwrap_or_default();

        // Not in web-sys: Chromium-only property
        let device_memory_gb = Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
            .ok()
            .and_then(|value| value.as_f64());
        let touch_events =
            Reflect::has(&self.window, &JsValue::from_str("ontouchstart")).unwrap_or(false);

        Ok(NavigatorInfo {
            user_agent: navigator.user_agent().unwrap_or(defaults.user_agent),
            platform: navigator.platform().unwrap_or(defaults.platform),
            language: navigator.language().unwrap_or(defaults.language),
            hardware_concurrency: navigator.hardware_concurrency() as u32,
            device_memory_gb,
            max_touch_points: navigator.max_touch_points().max(0) as u32,
            touch_events,
            plugins,
        })
    }

    fn screen(&self) -> Result<ScreenInfo, ProbeError> {
        let screen = self
            .window
            .screen()
            .map_err(|_| ProbeError::Unavailable("screen"))?;
        let read = |value: Result<i32, JsValue>| value.map(|v| v.max(0) as u32).unwrap_or(0);
        Ok(ScreenInfo {
            width: read(screen.width()),
            height: read(screen.height()),
            color_depth: read(screen.color_depth()),
        })
    }

    fn timezone(&self) -> Result<String, ProbeError> {
        let options = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new())
            .resolved_options();
        Reflect::get(&options, &JsValue::from_str("timeZone"))
            .ok()
            .and_then(|value| value.as_string())
            .ok_or(ProbeError::Unavailable("intl"))
    }

    fn sleep(&self, duration: Duration) -> ProbeFuture<'_, ()> {
        let millis = duration.as_millis().min(i32::MAX as u128) as i32;
        let window = self.window.clone();
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
        });
        Box::pin(async move {
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        })
    }
}

struct DomCanvas {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl Canvas2d for DomCanvas {
    fn set_text_baseline(&mut self, baseline: &str) {
        self.context.set_text_baseline(baseline);
    }

    fn set_fill_style(&mut self, style: &str) {
        self.context.set_fill_style_str(style);
    }

    fn set_font(&mut self, font: &str) {
        self.context.set_font(font);
    }

    fn set_composite_operation(&mut self, operation: &str) -> Result<(), ProbeError> {
        self.context
            .set_global_composite_operation(operation)
            .map_err(|e| js_failure("globalCompositeOperation", e))
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.context.fill_rect(x, y, width, height);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError> {
        self.context
            .fill_text(text, x, y)
            .map_err(|e| js_failure("fillText", e))
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<(), ProbeError> {
        self.context.begin_path();
        self.context
            .arc(x, y, radius, 0.0, std::f64::consts::TAU)
            .map_err(|e| js_failure("arc", e))?;
        self.context.close_path();
        self.context.fill();
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> Result<f64, ProbeError> {
        self.context
            .measure_text(text)
            .map(|metrics| metrics.width())
            .map_err(|e| js_failure("measureText", e))
    }

    fn encode(&mut self) -> Result<String, ProbeError> {
        self.canvas
            .to_data_url()
            .map_err(|e| js_failure("toDataURL", e))
    }
}

impl Drop for DomCanvas {
    fn drop(&mut self) {
        // Zero-size the backing store so the pixels can be reclaimed now
        self.canvas.set_width(0);
        self.canvas.set_height(0);
    }
}

struct DomWebGl {
    canvas: HtmlCanvasElement,
    gl: Gl,
    debug_renderer_info: bool,
}

impl WebGlSurface for DomWebGl {
    fn has_debug_renderer_info(&self) -> bool {
        self.debug_renderer_info
    }

    fn parameter(&self, parameter: GlParameter) -> Result<String, ProbeError> {
        let name = match parameter {
            GlParameter::Vendor => Gl::VENDOR,
            GlParameter::Renderer => Gl::RENDERER,
            GlParameter::UnmaskedVendor => UNMASKED_VENDOR_WEBGL,
            GlParameter::UnmaskedRenderer => UNMASKED_RENDERER_WEBGL,
            GlParameter::Version => Gl::VERSION,
            GlParameter::ShadingLanguageVersion => Gl::SHADING_LANGUAGE_VERSION,
            GlParameter::MaxTextureSize => Gl::MAX_TEXTURE_SIZE,
            GlParameter::MaxVertexAttribs => Gl::MAX_VERTEX_ATTRIBS,
            GlParameter::MaxVertexUniformVectors => Gl::MAX_VERTEX_UNIFORM_VECTORS,
            GlParameter::MaxVaryingVectors => Gl::MAX_VARYING_VECTORS,
            GlParameter::MaxFragmentUniformVectors => Gl::MAX_FRAGMENT_UNIFORM_VECTORS,
        };
        let value = self
            .gl
            .get_parameter(name)
            .map_err(|e| js_failure("getParameter", e))?;
        Ok(value
            .as_string()
            .or_else(|| value.as_f64().map(|n| n.to_string()))
            .unwrap_or_else(|| "null".to_string()))
    }
}

impl Drop for DomWebGl {
    fn drop(&mut self) {
        self.canvas.set_width(0);
        self.canvas.set_height(0);
    }
}

type OutputSender = Rc<RefCell<Option<oneshot::Sender<Result<Vec<f32>, ProbeError>>>>>;

struct DomAudioGraph {
    context: AudioContext,
    oscillator: OscillatorNode,
    analyser: AnalyserNode,
    processor: ScriptProcessorNode,
    gain: GainNode,
    receiver: Option<oneshot::Receiver<Result<Vec<f32>, ProbeError>>>,
    on_process: Option<Closure<dyn FnMut(AudioProcessingEvent)>>,
    released: bool,
}

impl DomAudioGraph {
    fn build(spec: &AudioGraphSpec) -> Result<Self, ProbeError> {
        let context = AudioContext::new().map_err(|_| ProbeError::Unavailable("audio"))?;
        // The context is already running; a node that fails to build must not leak it
        let (oscillator, analyser, processor, gain) = close_on_error(
            &context,
            |context| {
                Ok((
                    context
                        .create_oscillator()
                        .map_err(|e| js_failure("createOscillator", e))?,
                    context
                        .create_analyser()
                        .map_err(|e| js_failure("createAnalyser", e))?,
                    context
                        .create_script_processor_with_buffer_size(spec.buffer_size)
                        .map_err(|e| js_failure("createScriptProcessor", e))?,
                    context
                        .create_gain()
                        .map_err(|e| js_failure("createGain", e))?,
                ))
            },
            |context| {
                let _ = context.close();
            },
        )?;

        oscillator.set_type(match spec.waveform {
            Waveform::Sine => OscillatorType::Sine,
            Waveform::Square => OscillatorType::Square,
            Waveform::Sawtooth => OscillatorType::Sawtooth,
            Waveform::Triangle => OscillatorType::Triangle,
        });
        oscillator.frequency().set_value(spec.frequency_hz);
        gain.gain().set_value(spec.gain);

        let (sender, receiver) = oneshot::channel();
        let sender: OutputSender = Rc::new(RefCell::new(Some(sender)));
        let on_process = Closure::<dyn FnMut(AudioProcessingEvent)>::new(
            move |event: AudioProcessingEvent| {
                let Some(sender) = sender.borrow_mut().take() else {
                    return;
                };
                let samples = event
                    .output_buffer()
                    .and_then(|buffer| buffer.get_channel_data(0))
                    .map_err(|e| js_failure("outputBuffer", e));
                let _ = sender.send(samples);
            },
        );

        let mut graph = Self {
            context,
            oscillator,
            analyser,
            processor,
            gain,
            receiver: Some(receiver),
            on_process: Some(on_process),
            released: false,
        };
        // Any failure past this point still goes through release()
        if let Err(e) = graph.connect() {
            graph.release();
            return Err(e);
        }
        Ok(graph)
    }

    fn connect(&self) -> Result<(), ProbeError> {
        let link = |e| js_failure("connect", e);
        self.oscillator
            .connect_with_audio_node(&self.analyser)
            .map_err(link)?;
        self.analyser
            .connect_with_audio_node(&self.processor)
            .map_err(link)?;
        self.processor
            .connect_with_audio_node(&self.gain)
            .map_err(link)?;
        self.gain
            .connect_with_audio_node(&self.context.destination())
            .map_err(link)?;
        if let Some(callback) = &self.on_process {
            self.processor
                .set_onaudioprocess(Some(callback.as_ref().unchecked_ref()));
        }
        self.oscillator
            .start()
            .map_err(|e| js_failure("oscillator.start", e))
    }
}

impl AudioGraph for DomAudioGraph {
    fn first_output(&mut self) -> ProbeFuture<'_, Result<Vec<f32>, ProbeError>> {
        let receiver = self.receiver.take();
        Box::pin(async move {
            match receiver {
                Some(receiver) => receiver
                    .await
                    .unwrap_or_else(|_| Err(ProbeError::Failed("audio graph released".to_string()))),
                None => Err(ProbeError::Failed("audio output already taken".to_string())),
            }
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.processor.set_onaudioprocess(None);
        let _ = self.oscillator.stop();
        let _ = self.oscillator.disconnect();
        let _ = self.analyser.disconnect();
        let _ = self.processor.disconnect();
        let _ = self.gain.disconnect();
        let _ = self.context.close();
        self.on_process = None;
    }
}

impl Drop for DomAudioGraph {
    fn drop(&mut self) {
        self.release();
    }
}
