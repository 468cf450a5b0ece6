//! Magmag entry point
//!
//! In the browser this wires a session to the page's awareness document and a
//! 2D canvas. Natively it runs a headless demo with several sessions sharing
//! one in-memory presence hub.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent, TouchEvent,
    };

    use magmag::sim::BodyKind;
    use magmag::sync::{ChangeSet, ConnectionId, PeerState, PresenceStore, Snapshot};
    use magmag::{Error, Session, Settings, Tuning, avatar};

    /// Pixel size avatar images are rasterized at
    const AVATAR_SIZE: u32 = 128;

    // Bridge to the awareness document the page exposes as `window.magmagAwareness`
    #[wasm_bindgen(inline_js = "
        function awareness() {
            return window.magmagAwareness;
        }

        export function awareness_ready() {
            return !!awareness();
        }

        export function awareness_client_id() {
            return awareness().clientID;
        }

        export function awareness_states_json() {
            const out = {};
            awareness().getStates().forEach((state, id) => { out[id] = state; });
            return JSON.stringify(out);
        }

        export function awareness_set_local_state(json) {
            awareness().setLocalState(json === undefined ? null : JSON.parse(json));
        }

        export function awareness_on_change(cb) {
            awareness().on('change', (changes) => cb(JSON.stringify(changes)));
        }
    ")]
    extern "C" {
        fn awareness_ready() -> bool;
        fn awareness_client_id() -> f64;
        fn awareness_states_json() -> String;
        fn awareness_set_local_state(json: Option<String>);
        fn awareness_on_change(cb: &Closure<dyn FnMut(String)>);
    }

    /// Presence store backed by the JS awareness document
    struct JsAwareness;

    impl PresenceStore for JsAwareness {
        fn client_id(&self) -> ConnectionId {
            ConnectionId(awareness_client_id() as u64)
        }

        fn states(&self) -> Snapshot {
            let raw: BTreeMap<String, serde_json::Value> =
                match serde_json::from_str(&awareness_states_json()) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("{}", Error::from(e));
                        return Snapshot::new();
                    }
                };

            let mut snapshot = Snapshot::new();
            for (key, value) in raw {
                let Ok(id) = key.parse::<u64>() else {
                    log::warn!("Ignoring presence key {:?}", key);
                    continue;
                };
                match PeerState::from_value(value) {
                    Ok(state) => {
                        snapshot.insert(ConnectionId(id), state);
                    }
                    Err(e) => log::warn!("Peer {}: {}", id, e),
                }
            }
            snapshot
        }

        fn set_local_state(&mut self, state: Option<PeerState>) {
            match state.map(|s| s.to_json()).transpose() {
                Ok(json) => awareness_set_local_state(json),
                Err(e) => log::warn!("Could not publish state: {}", e),
            }
        }
    }

    /// Browser game holding the session and drawing surface
    struct Game {
        session: Session<JsAwareness>,
        settings: Settings,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        /// Change notifications waiting for the next frame
        changes: Rc<RefCell<Vec<ChangeSet>>>,
        /// Avatar images by texture seed
        avatars: BTreeMap<String, HtmlImageElement>,
    }

    /// Cached avatar image for `seed`, created on first use
    fn avatar_image(
        cache: &mut BTreeMap<String, HtmlImageElement>,
        seed: &str,
    ) -> Option<HtmlImageElement> {
        if let Some(image) = cache.get(seed) {
            return Some(image.clone());
        }
        let image = HtmlImageElement::new().ok()?;
        image.set_src(&avatar::data_url(seed, AVATAR_SIZE));
        cache.insert(seed.to_string(), image.clone());
        Some(image)
    }

    impl Game {
        fn frame(&mut self, time: f64) {
            let pending = std::mem::take(&mut *self.changes.borrow_mut());
            for change in &pending {
                self.session.on_presence_change(change);
            }

            self.session.tick(time);

            for event in self.session.take_events() {
                if self.settings.show_notifications {
                    log::info!("{:?}", event);
                }
            }

            self.render();
        }

        fn resize(&mut self, width: f32, height: f32) {
            self.canvas.set_width(width as u32);
            self.canvas.set_height(height as u32);
            self.session.resize(width, height);
        }

        fn render(&mut self) {
            let Self {
                session,
                settings,
                ctx,
                avatars,
                ..
            } = self;
            let viewport = session.viewport();
            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str("#1d1d1f");
            ctx.fill_rect(0.0, 0.0, viewport.x as f64, viewport.y as f64);

            let growth = session.growth();
            let title_hidden = settings.reduced_motion && !growth.is_showing_score();
            if settings.show_score && !title_hidden {
                ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", growth.text_alpha));
                ctx.set_font(&format!("{}px sans-serif", growth.text_size));
                ctx.set_text_align("center");
                ctx.set_text_baseline("middle");
                let _ = ctx.fill_text(
                    &growth.text,
                    (viewport.x / 2.0) as f64,
                    (viewport.y / 2.0) as f64,
                );
            }

            for body in session.world().bodies() {
                let r = body.visual_radius() as f64;
                let (x, y) = (body.pos.x as f64, body.pos.y as f64);
                ctx.set_global_alpha(body.opacity as f64);

                // Ambient dust stays flat; players wear their avatar once loaded
                let image = match body.kind {
                    BodyKind::Ambient => None,
                    _ => avatar_image(avatars, &body.texture_seed),
                };
                ctx.begin_path();
                let _ = ctx.arc(x, y, r, 0.0, std::f64::consts::TAU);
                match image.filter(HtmlImageElement::complete) {
                    Some(image) => {
                        ctx.save();
                        ctx.clip();
                        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                            &image,
                            x - r,
                            y - r,
                            r * 2.0,
                            r * 2.0,
                        );
                        ctx.restore();
                    }
                    None => {
                        ctx.set_fill_style_str(avatar::base_color(&body.texture_seed));
                        ctx.fill();
                    }
                }

                if body.kind != BodyKind::Ambient {
                    let facing = Vec2::from_angle(body.angle) * body.visual_radius();
                    ctx.set_stroke_style_str("rgba(0, 0, 0, 0.6)");
                    ctx.begin_path();
                    ctx.move_to(x, y);
                    ctx.line_to(x + facing.x as f64, y + facing.y as f64);
                    ctx.stroke();
                }
            }
            ctx.set_global_alpha(1.0);
        }
    }

    fn viewport(window: &web_sys::Window) -> (f32, f32) {
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1280.0);
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(720.0);
        (w as f32, h as f32)
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Magmag starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if !awareness_ready() {
            return Err("window.magmagAwareness is not set".into());
        }

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let seed = js_sys::Date::now() as u64;
        let mut settings = Settings::load();
        let identity = settings.identity(&mut Pcg32::seed_from_u64(seed));
        settings.save();

        let mut session =
            Session::new(JsAwareness, Tuning::default(), seed).with_identity(identity);
        session.set_attraction(settings.attraction);

        let game = Rc::new(RefCell::new(Game {
            session,
            settings,
            canvas: canvas.clone(),
            ctx,
            changes: Rc::new(RefCell::new(Vec::new())),
            avatars: BTreeMap::new(),
        }));

        {
            let (w, h) = viewport(&window);
            let mut g = game.borrow_mut();
            g.resize(w, h);
            g.session.start();
        }

        setup_presence(&game);
        setup_input_handlers(&canvas, game.clone());
        setup_window_handlers(game.clone());

        request_animation_frame(game);

        log::info!("Magmag running!");
        Ok(())
    }

    fn setup_presence(game: &Rc<RefCell<Game>>) {
        // Notifications can fire while the session is publishing, so they are
        // queued and applied at the start of the next frame.
        let changes = game.borrow().changes.clone();
        let closure = Closure::<dyn FnMut(String)>::new(move |json: String| {
            match serde_json::from_str::<ChangeSet>(&json) {
                Ok(change) => changes.borrow_mut().push(change),
                Err(e) => log::warn!("Bad change notification: {}", e),
            }
        });
        awareness_on_change(&closure);
        closure.forget();
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse move
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                game.borrow_mut().session.set_pointer(pos);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start/move
        for name in ["touchstart", "touchmove"] {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let x = touch.client_x() as f32 - rect.left() as f32;
                    let y = touch.client_y() as f32 - rect.top() as f32;
                    game.borrow_mut().session.set_pointer(Vec2::new(x, y));
                }
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_window_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Resize
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if let Some(window) = web_sys::window() {
                    let (w, h) = viewport(&window);
                    game.borrow_mut().resize(w, h);
                }
            });
            let _ = window
                .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Leave the document when the tab goes away
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().session.leave();
            });
            let _ = window
                .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "a" | "A" => {
                        let enabled = !g.session.attraction();
                        g.session.set_attraction(enabled);
                        g.settings.attraction = enabled;
                        g.settings.save();
                        log::info!("Attraction: {}", enabled);
                    }
                    "Escape" | "p" | "P" => {
                        if g.session.is_running() {
                            g.session.stop();
                        } else {
                            g.session.start();
                        }
                    }
                    "n" | "N" => {
                        if g.session.regenerate_identity() {
                            let seed = g.session.peer_id().to_string();
                            g.settings.avatar_seed = Some(seed);
                            g.settings.save();
                        }
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Magmag (native) starting...");
    log::info!("Running a headless demo - build for wasm32 to play in the browser");

    demo::run(3, 10.0);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::Vec2;

    use magmag::consts::SIM_DT_MS;
    use magmag::sim::BodyKind;
    use magmag::sync::{MemoryPresence, PresenceHub, PresenceStore};
    use magmag::{Session, Tuning};

    fn deliver(session: &mut Session<MemoryPresence>) {
        for change in session.presence().drain_changes() {
            session.on_presence_change(&change);
        }
        for event in session.take_events() {
            log::info!("[{}] {:?}", session.presence().client_id(), event);
        }
    }

    /// Several players on one hub, each chasing a point on a circle
    pub fn run(players: usize, seconds: f64) {
        let hub = PresenceHub::new();
        let mut sessions: Vec<Session<MemoryPresence>> = (0..players)
            .map(|i| Session::new(hub.connect(), Tuning::default(), i as u64 + 1))
            .collect();

        for session in &mut sessions {
            session.start();
        }

        let steps = (seconds * 1000.0 / SIM_DT_MS) as usize;
        for step in 0..steps {
            let time = step as f64 * SIM_DT_MS;
            for (i, session) in sessions.iter_mut().enumerate() {
                let offset = i as f32 * std::f32::consts::TAU / players as f32;
                let phase = time as f32 / 1000.0 + offset;
                let target = session.viewport() / 2.0 + Vec2::from_angle(phase) * 200.0;
                session.set_pointer(target);
                session.tick(time);
            }
            for session in &mut sessions {
                deliver(session);
            }
        }

        if let Some(mut leaving) = sessions.pop() {
            log::info!("Player {} leaves", leaving.presence().client_id());
            leaving.leave();
        }
        for session in &mut sessions {
            deliver(session);
        }

        println!("\nAfter {:.0}s:", seconds);
        for session in &sessions {
            let scale = session.player().map(|p| p.scale).unwrap_or(1.0);
            println!(
                "  player {} ({}): scale {:.3}, {} remote, {} ambient, score {}",
                session.presence().client_id(),
                session.peer_id(),
                scale,
                session.registry().len(),
                session.world().count(BodyKind::Ambient),
                session.growth().score,
            );
        }
        println!("  presence document holds {} peers", hub.peers().len());
    }
}
