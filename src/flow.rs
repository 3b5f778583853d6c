//! Application event loop.
//!
//! This module owns the window, the scene and the tone coordinator. Loads are
//! spawned as independent tasks (tokio natively, `spawn_local` in the browser)
//! and every completion travels back through the winit event loop proxy, so
//! the scene and the coordinator are only ever touched from the loop itself.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window and its renderer, builds the scene and starts one load per tone
//! 2. `user_event` applies finished loads and slider changes from the page
//! 3. `window_event` routes pointer input to the camera and keys to the slider, Escape closes
//! 4. On every redraw the camera integrates its inertia and the renderer draws the scene

use std::{fmt::Debug, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    context::{Context, ViewerConfig},
    coordinator::{LoadCompletion, LoadEvent, PendingLoad, ToneCoordinator},
    data_structures::scene_graph::SceneGraph,
    render::{Renderer, RendererConstructor},
    resources::MeshImporter,
    ui::ToneSlider,
};

#[cfg(target_arch = "wasm32")]
use crate::ui::DomSlider;

/// Events delivered to the loop from spawned tasks and page callbacks.
pub enum ViewerEvent {
    Loaded(LoadCompletion),
    Slider(i32),
    /// The browser creates its renderer asynchronously.
    #[cfg(target_arch = "wasm32")]
    RendererReady(Box<dyn Renderer>),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(completion) => f.debug_tuple("Loaded").field(completion).finish(),
            Self::Slider(value) => f.debug_tuple("Slider").field(value).finish(),
            #[cfg(target_arch = "wasm32")]
            Self::RendererReady(_) => f.write_str("RendererReady"),
        }
    }
}

/// Keys that close the viewer.
pub fn is_exit_key(code: KeyCode) -> bool {
    code == KeyCode::Escape
}

/// Window title: the selected tone, followed by the load progress until all tones are in.
pub fn window_title(title: &str, slider: &ToneSlider, coordinator: &ToneCoordinator) -> String {
    format!("{} | {}", title, slider.status_text(coordinator))
}

/// Everything that exists once the window is up.
pub struct ViewerState {
    pub ctx: Context,
    pub scene: SceneGraph,
    pub coordinator: ToneCoordinator,
    pub slider: ToneSlider,
    title: String,
    load_started: Instant,
    #[cfg(target_arch = "wasm32")]
    dom: Option<DomSlider>,
}

impl ViewerState {
    fn apply_slider(&mut self) {
        let key = self
            .coordinator
            .set_control_value(self.slider.value() as f64, &mut self.scene);
        log::info!("Slider at {} selects tone {}", self.slider.value(), key);
        self.show_display();
        self.ctx.request_redraw();
    }

    fn show_display(&self) {
        self.ctx
            .set_title(&window_title(&self.title, &self.slider, &self.coordinator));
        #[cfg(target_arch = "wasm32")]
        if let Some(dom) = &self.dom {
            dom.show(&self.slider, &self.slider.status_text(&self.coordinator));
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        match self.coordinator.complete_load(completion, &mut self.scene) {
            LoadEvent::Ready { active } => {
                log::info!(
                    "Revealed tone {} after {:.2}s",
                    active,
                    self.load_started.elapsed().as_secs_f32()
                );
            }
            LoadEvent::Failed { key } => {
                log::error!("Tone {} will never finish loading, nothing will be shown", key);
            }
            LoadEvent::Progress { .. } | LoadEvent::Ignored { .. } => (),
        }
        self.show_display();
        self.ctx.request_redraw();
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    importer: Box<dyn MeshImporter>,
    make_renderer: Option<RendererConstructor>,
    renderer: Option<Box<dyn Renderer>>,
    state: Option<ViewerState>,
}

impl App {
    fn new(
        event_loop: &EventLoop<ViewerEvent>,
        config: ViewerConfig,
        importer: Box<dyn MeshImporter>,
        make_renderer: RendererConstructor,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            importer,
            make_renderer: Some(make_renderer),
            renderer: None,
            state: None,
        })
    }

    /// Runs a load to completion in the background and posts the result to the loop.
    fn spawn_load(&self, pending: PendingLoad) {
        let proxy = self.proxy.clone();
        let deliver = async move {
            let completion = pending.await;
            if proxy.send_event(ViewerEvent::Loaded(completion)).is_err() {
                log::error!("Event loop was closed before a tone load could be delivered");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.async_runtime.spawn(deliver);
        }

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(deliver);
        }
    }

    /// Creates the renderer for `window`. Natively this blocks until the
    /// device is open; in the browser the renderer arrives as a [`ViewerEvent`].
    fn init_renderer(&mut self, event_loop: &ActiveEventLoop, window: Arc<Window>) {
        let Some(make_renderer) = self.make_renderer.take() else {
            return;
        };
        let init_future = make_renderer(window);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(e) => {
                    log::error!("Could not create the renderer: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let _ = event_loop;
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(renderer) => {
                        if proxy.send_event(ViewerEvent::RendererReady(renderer)).is_err() {
                            log::error!("Event loop was closed before the renderer was ready");
                        }
                    }
                    Err(e) => log::error!("Could not create the renderer: {:#}", e),
                }
            });
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn bind_dom(&self, slider: &ToneSlider) -> Option<DomSlider> {
        let proxy = self.proxy.clone();
        let bound = DomSlider::bind(
            slider,
            &self.config.slider_element_id,
            &self.config.display_element_id,
            move |value| {
                if proxy.send_event(ViewerEvent::Slider(value)).is_err() {
                    log::error!("Event loop was closed, dropping slider value {}", value);
                }
            },
        );
        match bound {
            Ok(dom) => Some(dom),
            Err(e) => {
                log::warn!("Tone slider is not available on this page: {:#}", e);
                None
            }
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.config.canvas_id))
                .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok());
            if canvas.is_none() {
                log::warn!("No <canvas id=\"{}\"> found, creating one", self.config.canvas_id);
            }
            window_attributes = window_attributes.with_canvas(canvas);
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create the viewer window: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.init_renderer(event_loop, window.clone());

        let ctx = Context::new(window, self.config.camera.clone());
        let scene = SceneGraph::with_environment(&self.config.scene);
        let mut coordinator = ToneCoordinator::from_config(&self.config);
        let slider = ToneSlider::new(&self.config.slider);

        for tone in &self.config.tones {
            match coordinator.begin_load(&tone.key, &tone.asset, self.importer.as_ref()) {
                Ok(pending) => self.spawn_load(pending),
                Err(e) => log::error!("Not loading tone {}: {:#}", tone.key, e),
            }
        }

        if let Some(renderer) = &mut self.renderer {
            renderer.resize(ctx.width, ctx.height);
        }

        let state = ViewerState {
            #[cfg(target_arch = "wasm32")]
            dom: self.bind_dom(&slider),
            ctx,
            scene,
            coordinator,
            slider,
            title: self.config.title.clone(),
            load_started: Instant::now(),
        };
        state.show_display();
        state.ctx.request_redraw();
        self.state = Some(state);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Loaded(completion) => match &mut self.state {
                Some(state) => state.apply_completion(completion),
                None => log::warn!("Dropping load of tone {}, the viewer is not running", completion.key),
            },
            ViewerEvent::Slider(value) => {
                if let Some(state) = &mut self.state {
                    if state.slider.set(value) {
                        state.apply_slider();
                    }
                }
            }
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::RendererReady(mut renderer) => {
                if let Some(state) = &self.state {
                    renderer.resize(state.ctx.width, state.ctx.height);
                    state.ctx.request_redraw();
                }
                self.renderer = Some(renderer);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if state
            .ctx
            .controller
            .handle_window_events(&mut state.ctx.camera, &event)
        {
            state.ctx.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.ctx.resize(size.width, size.height);
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(state.ctx.width, state.ctx.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.physical_key, PhysicalKey::Code(code) if is_exit_key(code))
                {
                    event_loop.exit();
                } else if state.slider.handle_key(&event) {
                    state.apply_slider();
                }
            }
            WindowEvent::RedrawRequested => {
                state.ctx.camera.update();
                if let Some(renderer) = &mut self.renderer {
                    if let Err(e) = renderer.render(&state.scene, &state.ctx.camera) {
                        log::error!("Unable to render {}", e);
                    }
                }
                state.ctx.request_redraw();
            }
            _ => {}
        }
    }
}

/// Opens the viewer and blocks until its window is closed.
///
/// `make_renderer` is called once the window exists, see
/// [`crate::gpu::GpuRenderer::constructor`].
pub fn run<I>(config: ViewerConfig, importer: I, make_renderer: RendererConstructor) -> anyhow::Result<()>
where
    I: MeshImporter + 'static,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::warn!("A logger was already installed");
        }
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config, Box::new(importer), make_renderer)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
