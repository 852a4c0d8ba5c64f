#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod parse;
pub mod session;
pub mod snapshot;

use std::fmt;

use geom::{ExtrusionSegment, GeomMesh, Point3, ProfileVertex, SmoothOptions, SplineNode};
use serde::Serialize;
use session::EngineSession;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    // a second initialize() keeps the logger installed by the first
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

/// Mesh buffers as handed to JavaScript, flattened for typed-array upload.
#[derive(Debug, Serialize)]
struct MeshExport<'a> {
    positions: &'a [f64],
    #[serde(skip_serializing_if = "Option::is_none")]
    normals: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uvs: Option<&'a [f64]>,
    indices: &'a [u32],
}

impl<'a> MeshExport<'a> {
    fn new(mesh: &'a GeomMesh) -> Self {
        Self {
            positions: mesh.positions_flat(),
            normals: mesh.normals_flat(),
            uvs: mesh.uvs_flat(),
            indices: &mesh.indices,
        }
    }
}

/// Public entry point for consumers.
///
/// Starts with a two-node spline and the default triangle profile; call
/// [`tick`](Engine::tick) once per frame and read [`mesh`](Engine::mesh) when
/// it returns `true`.
#[wasm_bindgen]
pub struct Engine {
    session: EngineSession,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Engine {
        let mut session = EngineSession::default();
        session.set_extrusion(Some(ExtrusionSegment::new(ProfileVertex::default_shape())));
        Engine { session }
    }

    /// Replace the spline (and profile, when the document has one).
    #[wasm_bindgen]
    pub fn load_spline_xml(&mut self, xml: &str) -> Result<(), JsValue> {
        self.session.load_document(xml).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn spline_xml(&self) -> Result<String, JsValue> {
        self.session.to_document().map_err(to_js_error)
    }

    /// Append a node; returns its index.
    #[wasm_bindgen]
    pub fn add_node(&mut self, x: f64, y: f64, z: f64, dx: f64, dy: f64, dz: f64) -> usize {
        self.session.add_node(SplineNode::new(
            Point3::new(x, y, z),
            Point3::new(dx, dy, dz),
        ))
    }

    #[wasm_bindgen]
    pub fn duplicate_node(&mut self, index: usize) -> Result<usize, JsValue> {
        self.session.duplicate_node(index).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn remove_node(&mut self, index: usize) -> Result<(), JsValue> {
        self.session.remove_node(index).map(|_| ()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_node_position(&mut self, index: usize, x: f64, y: f64, z: f64) -> Result<bool, JsValue> {
        self.session
            .set_node_position(index, Point3::new(x, y, z))
            .map_err(to_js_error)
    }

    /// Set the absolute outgoing handle of a node.
    #[wasm_bindgen]
    pub fn set_node_direction(&mut self, index: usize, x: f64, y: f64, z: f64) -> Result<bool, JsValue> {
        self.session
            .set_node_direction(index, Point3::new(x, y, z))
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_loop(&mut self, is_loop: bool) {
        self.session.set_loop(is_loop);
    }

    #[wasm_bindgen]
    pub fn smooth(&mut self, curvature: f64) -> Result<(), JsValue> {
        self.session
            .smooth(SmoothOptions { curvature })
            .map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_sample_spacing(&mut self, spacing: f64) -> Result<(), JsValue> {
        let extrusion = self
            .session
            .extrusion_mut()
            .ok_or_else(|| js_error("no extrusion profile loaded"))?;
        extrusion.set_sample_spacing(spacing).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_texture(&mut self, scale: f64, offset: f64) -> Result<(), JsValue> {
        let extrusion = self
            .session
            .extrusion_mut()
            .ok_or_else(|| js_error("no extrusion profile loaded"))?;
        extrusion.set_texture_scale(scale);
        extrusion.set_texture_offset(offset);
        Ok(())
    }

    /// Rebuild what changed since the last frame. Returns whether the mesh
    /// changed.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> Result<bool, JsValue> {
        let changed = self.session.tick().map_err(to_js_error)?.is_some();
        if changed {
            debug_log!("mesh rebuilt: {}", self.session.diagnostics().summary());
        }
        Ok(changed)
    }

    /// The current mesh as `{ positions, normals, uvs, indices }`.
    #[wasm_bindgen]
    pub fn mesh(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&MeshExport::new(self.session.mesh()))
            .map_err(|err| JsError::new(&err.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn diagnostics(&self) -> String {
        self.session.diagnostics().to_string()
    }

    #[wasm_bindgen]
    pub fn length(&self) -> f64 {
        self.session.spline().length()
    }

    #[wasm_bindgen]
    pub fn node_count(&self) -> usize {
        self.session.spline().node_count()
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
