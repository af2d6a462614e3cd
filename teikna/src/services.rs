//! Process wide services shared by all rendering calls.

use std::sync::{Arc, Mutex, OnceLock};

use crate::{
    collection::FontCollection,
    face::RenderingParams,
    raster::VectorRenderTarget,
};

/// Environment variable selecting the raster backend: `auto`, `legacy` or
/// `accelerated`.
pub const BACKEND_VAR: &str = "TEIKNA_BACKEND";

/// Largest width or height of an accelerated render target by default.
pub const DEFAULT_MAX_TARGET_DIMENSION: u32 = 16384;

/// Which raster backends may be used.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendPreference {
    /// The accelerated backend, falling back to the legacy backend when the
    /// former is unsupported.
    #[default]
    Auto,
    LegacyOnly,
    /// The accelerated backend without fallback.
    AcceleratedOnly,
}

impl BackendPreference {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "legacy" => Some(Self::LegacyOnly),
            "accelerated" => Some(Self::AcceleratedOnly),
            _ => None,
        }
    }
}

/// Configuration for glyph rasterization.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterConfig {
    pub backend: BackendPreference,
    /// Regions wider or taller than this are unsupported by the accelerated
    /// backend.
    pub max_target_dimension: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            max_target_dimension: DEFAULT_MAX_TARGET_DIMENSION,
        }
    }
}

impl RasterConfig {
    /// Default configuration with the backend taken from [`BACKEND_VAR`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(BACKEND_VAR) {
            match BackendPreference::parse(&value) {
                Some(backend) => config.backend = backend,
                None => log::warn!("ignoring unknown {BACKEND_VAR} value {value:?}"),
            }
        }
        config
    }
}

/// Font collection, render targets and defaults shared across calls.
///
/// Everything is created lazily on first use and lives as long as the
/// services object.
pub struct Services {
    config: RasterConfig,
    collection: OnceLock<FontCollection>,
    vector_target: OnceLock<Option<Mutex<VectorRenderTarget>>>,
    default_params: Arc<RenderingParams>,
}

static GLOBAL: OnceLock<Services> = OnceLock::new();

impl Services {
    /// Returns the process wide instance, configured from the environment
    /// and using the system font collection.
    pub fn global() -> &'static Services {
        GLOBAL.get_or_init(|| Services::new(RasterConfig::from_env()))
    }

    /// Creates services that scan the system fonts on first use.
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            collection: OnceLock::new(),
            vector_target: OnceLock::new(),
            default_params: Default::default(),
        }
    }

    /// Creates services over an explicit font collection.
    pub fn with_collection(config: RasterConfig, collection: FontCollection) -> Self {
        let services = Self::new(config);
        let _ = services.collection.set(collection);
        services
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    pub fn collection(&self) -> &FontCollection {
        self.collection.get_or_init(FontCollection::system)
    }

    pub fn default_rendering_params(&self) -> Arc<RenderingParams> {
        self.default_params.clone()
    }

    /// The shared accelerated render target, or `None` if the accelerated
    /// backend is unavailable.
    ///
    /// The capability check runs once, on first call.
    pub fn vector_target(&self) -> Option<&Mutex<VectorRenderTarget>> {
        self.vector_target
            .get_or_init(|| {
                if self.config.backend == BackendPreference::LegacyOnly {
                    log::debug!("accelerated backend disabled by configuration");
                    return None;
                }
                let target = VectorRenderTarget::detect(self.config.max_target_dimension);
                if target.is_none() {
                    log::debug!("accelerated backend unavailable");
                }
                target.map(Mutex::new)
            })
            .as_ref()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("default_params", &self.default_params)
            .finish_non_exhaustive()
    }
}
